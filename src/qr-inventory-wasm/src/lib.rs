mod context_menu;
mod controller;
mod dom;
mod dragdrop;
mod error;
mod filter;
mod gateway;
mod logging;
mod normalize;
mod paginate;
mod print_layout;
mod selection;
mod state;
mod tree;
mod types;

use controller::Inventory;
use dom::ScopedListener;
use error::{js_error_to_string, InventoryError};
use gateway::FetchGateway;
use types::{InventoryConfig, MoveTarget, Notice, StatusFilter};

use js_sys::{Function, Promise};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::EventTarget;

/// Plain JS objects (not `Map`s) so flattened structs read naturally
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Install console logging at the given level (`error` .. `trace`)
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    logging::init_logging(level);
}

/// QR inventory engine - folder browser over the admin QR API
#[wasm_bindgen]
pub struct QrInventoryEngine {
    inventory: Rc<Inventory<FetchGateway>>,
    dismiss_listener: Option<ScopedListener>,
}

#[wasm_bindgen]
impl QrInventoryEngine {
    /// Create an engine from an `InventoryConfig` object (or nothing)
    #[wasm_bindgen(constructor)]
    pub fn new(config_js: JsValue) -> Result<QrInventoryEngine, JsValue> {
        // Set panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config: InventoryConfig = if config_js.is_undefined() || config_js.is_null() {
            InventoryConfig::default()
        } else {
            from_value(config_js).map_err(InventoryError::from)?
        };

        let gateway = FetchGateway::new(&config).map_err(InventoryError::from)?;
        let inventory = Inventory::new(gateway, &config)?;
        tracing::info!(
            api = %config.api_base_url,
            page_size = config.page_size,
            "inventory engine created"
        );

        Ok(Self {
            inventory: Rc::new(inventory),
            dismiss_listener: None,
        })
    }

    // -- backend --------------------------------------------------------

    /// Re-fetch the file system listing
    #[wasm_bindgen(js_name = reload)]
    pub fn reload(&self) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            inventory.reload().await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Batch folders for the move dialog
    #[wasm_bindgen(js_name = loadBatches)]
    pub fn load_batches(&self) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let folders = inventory.load_batches().await?;
            to_js(&folders)
        })
    }

    #[wasm_bindgen(js_name = batchContents)]
    pub fn batch_contents(&self, batch_id: String) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let files = inventory.batch_contents(&batch_id).await?;
            to_js(&files)
        })
    }

    /// Drop the dragged node on a folder; resolves to "done" | "rejected" | "failed"
    #[wasm_bindgen(js_name = dropOn)]
    pub fn drop_on(&self, target_id: Option<String>) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let outcome = inventory.drop_on(target_id.as_deref()).await;
            to_js(&outcome)
        })
    }

    /// Move the selection into `{kind: "batch" | "new_batch", value}`
    #[wasm_bindgen(js_name = moveSelected)]
    pub fn move_selected(&self, target_js: JsValue) -> Result<Promise, JsValue> {
        let target: MoveTarget = from_value(target_js).map_err(InventoryError::from)?;
        let inventory = Rc::clone(&self.inventory);
        Ok(future_to_promise(async move {
            let outcome = inventory.move_selected(target).await;
            to_js(&outcome)
        }))
    }

    /// Delete the selection; `confirmed` must come from the user's prompt
    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&self, confirmed: bool) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let outcome = inventory.delete_selected(confirmed).await;
            to_js(&outcome)
        })
    }

    #[wasm_bindgen(js_name = generateBatch)]
    pub fn generate_batch(&self, count: u32, name: String) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let outcome = inventory.generate_batch(count, &name).await;
            to_js(&outcome)
        })
    }

    /// Delete unassigned codes of one batch, or everywhere when omitted
    #[wasm_bindgen(js_name = purgeUnmapped)]
    pub fn purge_unmapped(&self, batch_id: Option<String>) -> Promise {
        let inventory = Rc::clone(&self.inventory);
        future_to_promise(async move {
            let outcome = inventory.purge_unmapped(batch_id.as_deref()).await;
            to_js(&outcome)
        })
    }

    // -- view -----------------------------------------------------------

    /// Snapshot for rendering (see `InventoryView`)
    #[wasm_bindgen(js_name = view)]
    pub fn view(&self) -> Result<JsValue, JsValue> {
        let view = self.inventory.state().borrow_mut().view();
        to_js(&view)
    }

    #[wasm_bindgen(js_name = enterFolder)]
    pub fn enter_folder(&self, folder_id: Option<String>) -> Result<(), JsValue> {
        self.inventory
            .state()
            .borrow_mut()
            .enter(folder_id.as_deref())?;
        Ok(())
    }

    #[wasm_bindgen(js_name = up)]
    pub fn up(&self) -> bool {
        self.inventory.state().borrow_mut().up()
    }

    #[wasm_bindgen(js_name = setQuery)]
    pub fn set_query(&self, query: &str) {
        self.inventory.state().borrow_mut().set_query(query);
    }

    /// "all" | "assigned" | "active"
    #[wasm_bindgen(js_name = setStatusFilter)]
    pub fn set_status_filter(&self, status: &str) {
        self.inventory
            .state()
            .borrow_mut()
            .set_status(StatusFilter::parse(status));
    }

    #[wasm_bindgen(js_name = setPageSize)]
    pub fn set_page_size(&self, page_size: usize) -> Result<(), JsValue> {
        self.inventory.state().borrow_mut().set_page_size(page_size)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&self, page: usize) -> bool {
        self.inventory.state().borrow_mut().go_to_page(page)
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> bool {
        self.inventory.state().borrow_mut().next_page()
    }

    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&self) -> bool {
        self.inventory.state().borrow_mut().prev_page()
    }

    /// Number of nodes in the cache
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> usize {
        self.inventory.state().borrow().tree().len()
    }

    // -- selection ------------------------------------------------------

    /// Row click; `modifier` is Ctrl/Cmd
    #[wasm_bindgen(js_name = click)]
    pub fn click(&self, id: &str, modifier: bool) {
        self.inventory.state().borrow_mut().click(id, modifier);
    }

    #[wasm_bindgen(js_name = backgroundClick)]
    pub fn background_click(&self) {
        self.inventory.state().borrow_mut().background_click();
    }

    #[wasm_bindgen(js_name = toggleSelectAll)]
    pub fn toggle_select_all(&self) {
        self.inventory.state().borrow_mut().toggle_select_all();
    }

    // -- drag and drop --------------------------------------------------

    #[wasm_bindgen(js_name = dragStart)]
    pub fn drag_start(&self, id: &str) -> Result<(), JsValue> {
        self.inventory.state().borrow_mut().drag_start(id)?;
        Ok(())
    }

    /// Hover target while dragging; `undefined` when leaving a folder
    #[wasm_bindgen(js_name = dragOver)]
    pub fn drag_over(&self, id: Option<String>) {
        self.inventory.state().borrow_mut().drag_over(id.as_deref());
    }

    #[wasm_bindgen(js_name = isDragging)]
    pub fn is_dragging(&self) -> bool {
        self.inventory.state().borrow().drag().dragged_id().is_some()
    }

    #[wasm_bindgen(js_name = dragEnd)]
    pub fn drag_end(&self) {
        self.inventory.state().borrow_mut().drag_end();
    }

    // -- context menu ---------------------------------------------------

    #[wasm_bindgen(js_name = openContextMenu)]
    pub fn open_context_menu(&self, id: &str, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let menu = self
            .inventory
            .state()
            .borrow_mut()
            .open_context_menu(id, x, y)?;
        to_js(&menu)
    }

    #[wasm_bindgen(js_name = dismissContextMenu)]
    pub fn dismiss_context_menu(&self) -> bool {
        self.inventory.state().borrow_mut().dismiss_context_menu()
    }

    /// Dismiss the context menu on any click on `target`.
    ///
    /// `on_dismiss` runs only when a menu was actually open. Rebinding
    /// replaces the previous listener.
    #[wasm_bindgen(js_name = bindDismissTarget)]
    pub fn bind_dismiss_target(
        &mut self,
        target: EventTarget,
        on_dismiss: Option<Function>,
    ) -> Result<(), JsValue> {
        self.dismiss_listener = None;

        let inventory = Rc::clone(&self.inventory);
        let listener = ScopedListener::new(target, "click", move |_event| {
            let dismissed = match inventory.state().try_borrow_mut() {
                Ok(mut state) => state.dismiss_context_menu(),
                Err(_) => false,
            };
            if !dismissed {
                return;
            }
            if let Some(callback) = &on_dismiss {
                if let Err(err) = callback.call0(&JsValue::NULL) {
                    tracing::warn!(error = %js_error_to_string(err), "dismiss callback threw");
                }
            }
        })?;

        self.dismiss_listener = Some(listener);
        Ok(())
    }

    // -- printing / notices ---------------------------------------------

    /// Pages of up to three cards each. Empty when there is nothing to
    /// print, in which case an info notice is queued instead.
    #[wasm_bindgen(js_name = printPages)]
    pub fn print_pages(&self) -> Result<JsValue, JsValue> {
        let mut state = self.inventory.state().borrow_mut();
        let pages = state.print_pages();
        if pages.is_empty() {
            state.notify(Notice::info("Nothing to print"));
        } else {
            tracing::info!(pages = pages.len(), "print layout ready");
        }
        to_js(&pages)
    }

    /// Drain queued toast messages
    #[wasm_bindgen(js_name = takeNotices)]
    pub fn take_notices(&self) -> Result<JsValue, JsValue> {
        let notices = self.inventory.state().borrow_mut().take_notices();
        to_js(&notices)
    }

    /// Abort in-flight requests and detach listeners
    #[wasm_bindgen(js_name = dispose)]
    pub fn dispose(&mut self) {
        self.inventory.gateway().abort_all();
        self.dismiss_listener = None;

        if let Ok(mut state) = self.inventory.state().try_borrow_mut() {
            state.drag_end();
            state.dismiss_context_menu();
        }
        tracing::debug!("inventory engine disposed");
    }
}

// Re-export key types for JavaScript
#[wasm_bindgen(typescript_custom_section)]
const TYPESCRIPT_TYPES: &'static str = r#"
export interface InventoryConfig {
    api_base_url?: string;
    auth_token?: string;
    page_size?: number;
    print_page_capacity?: number;
    payload_base_url?: string;
}

export interface QrNode {
    id: string;
    name: string;
    type: 'folder' | 'file';
    parentId: string | null;
    size: string;
    date: string;
    color?: string;
    url?: string;
    status?: 'assigned' | 'active';
    merchant_name?: string;
    merchant_mobile?: string;
}

export interface Crumb {
    id: string;
    name: string;
}

export interface ContextMenu {
    targetId: string;
    x: number;
    y: number;
    actions: ('open' | 'move' | 'delete')[];
    appliesTo: number;
}

export interface InventoryView {
    folder: string | null;
    breadcrumbs: Crumb[];
    items: QrNode[];
    page: number;
    pageSize: number;
    totalPages: number;
    totalItems: number;
    start: number;
    end: number;
    hasPrev: boolean;
    hasNext: boolean;
    selected: string[];
    dragOver: string | null;
    contextMenu: ContextMenu | null;
    loading: boolean;
}

export interface PrintPage {
    index: number;
    items: { id: string; name: string; payload: string }[];
}

export type MoveTarget =
    | { kind: 'batch'; value: string }
    | { kind: 'new_batch'; value: string };

export type Outcome = 'done' | 'rejected' | 'failed';

export interface Notice {
    level: 'info' | 'success' | 'error';
    message: string;
}
"#;
