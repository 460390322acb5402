use crate::context_menu::{ContextMenu, ContextMenuState};
use crate::dragdrop::{DragSession, DropPlan, DropRejection};
use crate::error::InventoryError;
use crate::filter::FilterEngine;
use crate::normalize::Normalizer;
use crate::paginate::{PageWindow, Pagination};
use crate::print_layout::{printable_items, PrintLayout, PrintPage};
use crate::selection::SelectionManager;
use crate::tree::TreeIndex;
use crate::types::{ApiId, InventoryConfig, Node, Notice, RawBatch, StatusFilter};
use serde::Serialize;
use std::collections::VecDeque;

/// Breadcrumb entry for the navigation bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: String,
    pub name: String,
}

/// Everything the folder view renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    pub folder: Option<String>,
    pub breadcrumbs: Vec<Crumb>,
    pub items: Vec<Node>,
    #[serde(flatten)]
    pub window: PageWindow,
    pub selected: Vec<String>,
    pub drag_over: Option<String>,
    pub context_menu: Option<ContextMenu>,
    pub loading: bool,
}

/// Synchronous view state of the inventory.
///
/// Holds the read-through node cache and every piece of UI state derived
/// from it. Network calls live in the controller; this type never awaits.
pub struct InventoryState {
    normalizer: Normalizer,
    tree: TreeIndex,
    current_folder: Option<String>,
    filter: FilterEngine,
    pagination: Pagination,
    selection: SelectionManager,
    drag: DragSession,
    menu: ContextMenuState,
    print_layout: PrintLayout,
    batches: Vec<RawBatch>,
    notices: VecDeque<Notice>,
    loading: bool,
    load_ticket: u64,
}

impl InventoryState {
    pub fn new(config: &InventoryConfig) -> Result<Self, InventoryError> {
        Ok(Self {
            normalizer: Normalizer::new(config.payload_base_url.clone()),
            tree: TreeIndex::new(),
            current_folder: None,
            filter: FilterEngine::new(),
            pagination: Pagination::new(config.page_size)?,
            selection: SelectionManager::new(),
            drag: DragSession::new(),
            menu: ContextMenuState::new(),
            print_layout: PrintLayout::new(config.print_page_capacity)?,
            batches: Vec::new(),
            notices: VecDeque::new(),
            loading: false,
            load_ticket: 0,
        })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn tree(&self) -> &TreeIndex {
        &self.tree
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.current_folder.as_deref()
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    // -- loading --------------------------------------------------------

    /// Mark a fetch as started; only the latest ticket may apply its result
    pub fn begin_load(&mut self) -> u64 {
        self.loading = true;
        self.load_ticket += 1;
        self.load_ticket
    }

    pub fn is_latest_load(&self, ticket: u64) -> bool {
        self.load_ticket == ticket
    }

    pub fn end_load(&mut self) {
        self.loading = false;
    }

    /// Replace the node cache with a fresh listing.
    ///
    /// The current folder survives only if it still exists as a folder,
    /// and selection keeps only ids that are still present.
    pub fn load(&mut self, nodes: Vec<Node>) {
        self.tree = TreeIndex::from_nodes(nodes);
        self.loading = false;

        if let Some(folder) = self.current_folder.as_deref() {
            if !self.tree.is_folder(folder) {
                tracing::info!(folder, "current folder vanished after reload, returning to root");
                self.current_folder = None;
                self.pagination.reset();
                self.selection.clear();
            }
        }

        let tree = &self.tree;
        self.selection.retain(|id| tree.contains(id));
        self.drag.drag_end();
        self.menu.dismiss();
        tracing::debug!(nodes = self.tree.len(), "node cache rebuilt");
    }

    pub fn set_batches(&mut self, batches: Vec<RawBatch>) {
        self.batches = batches;
    }

    /// Batch folders for the move-target picker
    pub fn batch_folders(&self) -> Vec<Node> {
        let mut folders = self.normalizer.normalize_batches(&self.batches);
        for folder in &mut folders {
            if let Some(cached) = self.tree.get(&folder.id) {
                folder.color = cached.color.clone();
            }
        }
        folders
    }

    // -- navigation -----------------------------------------------------

    /// Open a folder (`None` = root). Resets page and selection.
    pub fn enter(&mut self, folder: Option<&str>) -> Result<(), InventoryError> {
        if let Some(id) = folder {
            match self.tree.get(id) {
                Some(node) if node.is_folder() => {}
                Some(_) => return Err(InventoryError::NotAFolder(id.to_string())),
                None => return Err(InventoryError::UnknownNode(id.to_string())),
            }
        }
        self.current_folder = folder.map(str::to_string);
        self.pagination.reset();
        self.selection.clear();
        self.menu.dismiss();
        Ok(())
    }

    /// Go to the parent folder; no-op at root. Returns true when moved.
    pub fn up(&mut self) -> bool {
        let Some(current) = self.current_folder.as_deref() else {
            return false;
        };
        let parent = self
            .tree
            .get(current)
            .and_then(|node| node.parent_id.clone())
            .filter(|parent| self.tree.is_folder(parent));

        self.current_folder = parent;
        self.pagination.reset();
        self.selection.clear();
        self.menu.dismiss();
        true
    }

    // -- filter / paginate ----------------------------------------------

    /// A changed query returns to page 1 with nothing selected
    pub fn set_query(&mut self, query: &str) {
        if self.filter.set_query(query) {
            self.pagination.reset();
            self.selection.clear();
        }
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        if self.filter.set_status(status) {
            self.pagination.reset();
            self.selection.clear();
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), InventoryError> {
        self.pagination.set_page_size(page_size)?;
        self.selection.clear();
        Ok(())
    }

    /// Children of the current folder that pass search and status filters
    pub fn filtered(&self) -> Vec<&Node> {
        self.filter
            .apply_filters(self.tree.children_of(self.current_folder.as_deref()))
    }

    fn filtered_len(&self) -> usize {
        self.filtered().len()
    }

    /// Change page; selection is scoped to the page and cleared on change
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let total = self.filtered_len();
        let changed = self.pagination.go_to(page, total);
        if changed {
            self.selection.clear();
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.filtered_len();
        let changed = self.pagination.next(total);
        if changed {
            self.selection.clear();
        }
        changed
    }

    pub fn prev_page(&mut self) -> bool {
        let changed = self.pagination.prev();
        if changed {
            self.selection.clear();
        }
        changed
    }

    /// Nodes on the current page
    pub fn visible(&self) -> Vec<&Node> {
        let filtered = self.filtered();
        self.pagination.slice(&filtered).to_vec()
    }

    fn crumbs(&self) -> Result<Vec<Crumb>, InventoryError> {
        Ok(self
            .tree
            .breadcrumbs(self.current_folder.as_deref())?
            .iter()
            .map(|node| Crumb {
                id: node.id.clone(),
                name: node.name.clone(),
            })
            .collect())
    }

    /// Snapshot of everything the folder view needs.
    ///
    /// A cyclic ancestry queues an error notice and falls back to root. A
    /// stale page index is clamped, which drops the page-scoped selection.
    pub fn view(&mut self) -> InventoryView {
        let breadcrumbs = match self.crumbs() {
            Ok(crumbs) => crumbs,
            Err(err) => {
                tracing::error!(%err, "broken folder hierarchy, returning to root");
                self.notify(Notice::error(err.to_string()));
                self.current_folder = None;
                self.pagination.reset();
                self.selection.clear();
                self.menu.dismiss();
                Vec::new()
            }
        };

        let total = self.filtered_len();
        let before = self.pagination.page();
        if self.pagination.clamp(total) != before {
            self.selection.clear();
        }

        InventoryView {
            folder: self.current_folder.clone(),
            breadcrumbs,
            items: self.visible().into_iter().cloned().collect(),
            window: self.pagination.window(total),
            selected: self.selection.sorted_ids(),
            drag_over: self.drag.drag_over_folder_id().map(str::to_string),
            context_menu: self.menu.current().cloned(),
            loading: self.loading,
        }
    }

    // -- selection ------------------------------------------------------

    pub fn click(&mut self, id: &str, modifier: bool) {
        self.menu.dismiss();
        self.selection.click(id, modifier);
    }

    pub fn background_click(&mut self) {
        self.menu.dismiss();
        self.selection.clear();
    }

    pub fn toggle_select_all(&mut self) {
        let visible: Vec<String> = self.visible().into_iter().map(|node| node.id.clone()).collect();
        self.selection
            .toggle_select_all(visible.iter().map(String::as_str));
    }

    /// File ids a bulk action applies to: selected files plus the direct
    /// file children of selected folders, without repeats
    pub fn selected_file_ids(&self) -> Vec<ApiId> {
        let mut seen = ahash::AHashSet::new();
        let mut ids = Vec::new();

        for node in self.selection.ordered(self.tree.nodes()) {
            let files: Vec<&Node> = if node.is_file() {
                vec![node]
            } else {
                self.tree.file_children(&node.id).collect()
            };
            for file in files {
                if seen.insert(file.id.as_str()) {
                    ids.push(ApiId::parse(&file.id));
                }
            }
        }

        ids
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // -- drag and drop --------------------------------------------------

    pub fn drag_start(&mut self, id: &str) -> Result<(), InventoryError> {
        let node = self
            .tree
            .get(id)
            .ok_or_else(|| InventoryError::UnknownNode(id.to_string()))?;
        self.drag.drag_start(node);
        Ok(())
    }

    pub fn drag_over(&mut self, id: Option<&str>) {
        let node = id.and_then(|id| self.tree.get(id));
        self.drag.drag_over(node);
    }

    pub fn drag_end(&mut self) {
        self.drag.drag_end();
    }

    pub fn plan_drop(&self, target: Option<&str>) -> Result<DropPlan, DropRejection> {
        self.drag.plan_drop(target, &self.tree)
    }

    // -- context menu ---------------------------------------------------

    pub fn open_context_menu(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
    ) -> Result<ContextMenu, InventoryError> {
        let node = self
            .tree
            .get(id)
            .ok_or_else(|| InventoryError::UnknownNode(id.to_string()))?;
        Ok(self.menu.open(node, x, y, &mut self.selection).clone())
    }

    pub fn dismiss_context_menu(&mut self) -> bool {
        self.menu.dismiss()
    }

    // -- printing -------------------------------------------------------

    /// Print pages for the selection, or for the filtered folder listing
    /// when nothing is selected. Empty output means printing must not start.
    pub fn print_pages(&self) -> Vec<PrintPage> {
        let filtered = self.filtered();
        let items = printable_items(&self.selection, self.tree.nodes(), &filtered);
        self.print_layout.layout(items)
    }

    // -- notices --------------------------------------------------------

    pub fn notify(&mut self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "notice");
        self.notices.push_back(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoticeLevel, QrStatus};

    fn state_with(nodes: Vec<Node>, page_size: usize) -> InventoryState {
        let config = InventoryConfig {
            page_size,
            ..Default::default()
        };
        let mut state = InventoryState::new(&config).unwrap();
        state.load(nodes);
        state
    }

    fn files_in(folder: &str, count: usize) -> Vec<Node> {
        (1..=count)
            .map(|i| {
                Node::file(i.to_string(), format!("QR-{}", i), Some(folder), format!("pay/{}", i))
            })
            .collect()
    }

    #[test]
    fn test_enter_resets_page_and_selection() {
        let mut nodes = vec![Node::folder("F", "F", None), Node::folder("G", "G", None)];
        nodes.extend(files_in("F", 7));
        let mut state = state_with(nodes, 3);

        state.enter(Some("F")).unwrap();
        state.next_page();
        state.click("4", false);
        assert_eq!(state.selection().len(), 1);

        state.enter(Some("G")).unwrap();
        let view = state.view();
        assert_eq!(view.window.page, 1);
        assert!(view.selected.is_empty());
    }

    #[test]
    fn test_enter_rejects_files_and_unknown_ids() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 1));
        let mut state = state_with(nodes, 3);

        assert_eq!(state.enter(Some("1")), Err(InventoryError::NotAFolder("1".into())));
        assert_eq!(state.enter(Some("nope")), Err(InventoryError::UnknownNode("nope".into())));
        assert_eq!(state.current_folder(), None);
    }

    #[test]
    fn test_up_walks_to_parent_and_is_noop_at_root() {
        let nodes = vec![Node::folder("A", "A", None), Node::folder("B", "B", Some("A"))];
        let mut state = state_with(nodes, 10);

        assert!(!state.up());
        state.enter(Some("B")).unwrap();
        assert!(state.up());
        assert_eq!(state.current_folder(), Some("A"));
        assert!(state.up());
        assert_eq!(state.current_folder(), None);
    }

    #[test]
    fn test_page_change_clears_selection() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 6));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();

        for id in ["1", "2", "3"] {
            state.click(id, true);
        }
        assert_eq!(state.selection().len(), 3);

        assert!(state.go_to_page(2));
        assert!(state.selection().is_empty());
        let ids: Vec<String> = state.visible().iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["4", "5", "6"]);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 9));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();
        state.go_to_page(3);

        state.set_query("qr");
        assert_eq!(state.view().window.page, 1);

        state.go_to_page(2);
        state.set_status(StatusFilter::Active);
        assert_eq!(state.view().window.page, 1);
    }

    #[test]
    fn test_stale_page_is_clamped_after_reload() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 9));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();
        state.go_to_page(3);

        let mut shrunk = vec![Node::folder("F", "F", None)];
        shrunk.extend(files_in("F", 4));
        state.load(shrunk);

        let view = state.view();
        assert_eq!(view.window.page, 2);
        assert_eq!(view.items.len(), 1);
    }

    #[test]
    fn test_select_all_uses_visible_page() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 5));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();

        state.toggle_select_all();
        assert_eq!(state.selection().sorted_ids(), vec!["1", "2", "3"]);
        state.toggle_select_all();
        assert!(state.selection().is_empty());
    }

    #[test]
    fn test_status_filter_over_mixed_folder() {
        let mut nodes = vec![
            Node::folder("F", "F", None),
            Node::folder("f1", "Sub 1", Some("F")),
            Node::folder("f2", "Sub 2", Some("F")),
        ];
        let mut files = files_in("F", 3);
        files[0].status = Some(QrStatus::Assigned);
        files[1].status = Some(QrStatus::Active);
        files[2].status = Some(QrStatus::Active);
        nodes.extend(files);

        let mut state = state_with(nodes, 10);
        state.enter(Some("F")).unwrap();
        state.set_status(StatusFilter::Assigned);

        let ids: Vec<String> = state.view().items.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["f1", "f2", "1"]);
    }

    #[test]
    fn test_print_pages_from_folder_and_selection() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 7));
        let mut state = state_with(nodes, 50);
        state.enter(Some("F")).unwrap();

        let sizes: Vec<usize> = state.print_pages().iter().map(|p| p.items.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        state.click("5", false);
        let pages = state.print_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].items[0].id, "5");
    }

    #[test]
    fn test_empty_folder_prints_nothing() {
        let mut state = state_with(vec![Node::folder("F", "F", None)], 10);
        state.enter(Some("F")).unwrap();
        assert!(state.print_pages().is_empty());
    }

    #[test]
    fn test_reload_prunes_selection_and_lost_folder() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 3));
        let mut state = state_with(nodes, 10);
        state.enter(Some("F")).unwrap();
        state.click("1", true);
        state.click("2", true);

        let mut reloaded = vec![Node::folder("F", "F", None)];
        reloaded.push(Node::file("2", "QR-2", Some("F"), "pay/2"));
        state.load(reloaded);
        assert_eq!(state.selection().sorted_ids(), vec!["2"]);

        state.load(vec![]);
        assert_eq!(state.current_folder(), None);
        assert!(state.selection().is_empty());
    }

    #[test]
    fn test_cycle_falls_back_to_root_with_notice() {
        let nodes = vec![Node::folder("a", "A", None), Node::folder("b", "B", Some("a"))];
        let mut state = state_with(nodes, 10);
        state.enter(Some("b")).unwrap();
        state.load(vec![Node::folder("a", "A", Some("b")), Node::folder("b", "B", Some("a"))]);

        let view = state.view();
        assert_eq!(view.folder, None);
        assert!(view.breadcrumbs.is_empty());
        assert_eq!(state.current_folder(), None);

        let notices = state.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("cycle"));

        // Root renders cleanly afterwards, without repeating the notice
        state.view();
        assert!(state.take_notices().is_empty());
    }

    #[test]
    fn test_filter_change_clears_off_page_selection() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 6));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();
        state.go_to_page(2);
        state.click("5", false);

        state.set_query("qr");
        let view = state.view();
        assert_eq!(view.window.page, 1);
        assert!(view.selected.is_empty());

        let printed: Vec<String> = state
            .print_pages()
            .iter()
            .flat_map(|page| page.items.iter().map(|item| item.id.clone()))
            .collect();
        assert_eq!(printed, vec!["1", "2", "3", "4", "5", "6"]);

        state.go_to_page(2);
        state.click("4", false);
        state.set_status(StatusFilter::Active);
        assert!(state.selection().is_empty());
    }

    #[test]
    fn test_clamped_page_drops_selection() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 9));
        let mut state = state_with(nodes, 3);
        state.enter(Some("F")).unwrap();
        state.go_to_page(3);
        state.click("7", false);

        let mut shrunk = vec![Node::folder("F", "F", None)];
        shrunk.extend(files_in("F", 5));
        shrunk.push(Node::file("7", "QR-7", Some("F"), "pay/7"));
        state.load(shrunk);
        assert_eq!(state.selection().sorted_ids(), vec!["7"]);

        let view = state.view();
        assert_eq!(view.window.page, 2);
        assert!(view.selected.is_empty());
    }

    #[test]
    fn test_selected_file_ids_expand_folders_once() {
        let nodes = vec![
            Node::folder("batch_1", "B1", None),
            Node::file("7", "QR-7", Some("batch_1"), "p7"),
            Node::file("8", "QR-8", Some("batch_1"), "p8"),
        ];
        let mut state = state_with(nodes, 10);
        state.click("batch_1", true);
        state.click("8", true);

        assert_eq!(state.selected_file_ids(), vec![ApiId::Number(7), ApiId::Number(8)]);
    }

    #[test]
    fn test_context_menu_collapses_selection() {
        let mut nodes = vec![Node::folder("F", "F", None)];
        nodes.extend(files_in("F", 3));
        let mut state = state_with(nodes, 10);
        state.click("1", true);
        state.click("2", true);

        let menu = state.open_context_menu("3", 5.0, 6.0).unwrap();
        assert_eq!(menu.applies_to, 1);
        assert_eq!(state.selection().sorted_ids(), vec!["3"]);

        state.background_click();
        assert!(state.view().context_menu.is_none());
    }
}
