use crate::dragdrop::DropRejection;
use crate::error::{GatewayError, InventoryError};
use crate::gateway::QrGateway;
use crate::state::InventoryState;
use crate::types::{ApiId, GenerateRequest, InventoryConfig, MoveRequest, MoveTarget, Node, Notice};
use serde::Serialize;
use std::cell::RefCell;

/// Outcome of an operation that talks to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Mutation succeeded and the cache was reloaded
    Done,
    /// Rejected client-side before any request
    Rejected,
    /// Request failed (notice already queued)
    Failed,
}

/// Inventory workflow over a gateway.
///
/// State is borrowed only between awaits, never across one. Every
/// successful mutation is followed by a full reload.
pub struct Inventory<G> {
    gateway: G,
    state: RefCell<InventoryState>,
}

impl<G: QrGateway> Inventory<G> {
    pub fn new(gateway: G, config: &InventoryConfig) -> Result<Self, InventoryError> {
        Ok(Self {
            gateway,
            state: RefCell::new(InventoryState::new(config)?),
        })
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> &RefCell<InventoryState> {
        &self.state
    }

    fn notify(&self, notice: Notice) {
        self.state.borrow_mut().notify(notice);
    }

    /// Queue an error notice unless the request was aborted on teardown
    fn report(&self, context: &str, err: &GatewayError) {
        if matches!(err, GatewayError::Aborted) {
            tracing::debug!(context, "request aborted, ignoring");
            return;
        }
        tracing::error!(context, %err, "gateway call failed");
        self.notify(Notice::error(format!("{}: {}", context, err)));
    }

    /// Re-fetch the whole node list and rebuild the cache
    pub async fn reload(&self) -> Result<(), InventoryError> {
        let ticket = self.state.borrow_mut().begin_load();
        let fetched = self.gateway.file_system().await;

        let mut state = self.state.borrow_mut();
        if !state.is_latest_load(ticket) {
            tracing::debug!(ticket, "discarding superseded listing");
            return Ok(());
        }
        match fetched {
            Ok(raw) => {
                let nodes = state.normalizer().normalize_file_system(raw);
                state.load(nodes);
                Ok(())
            }
            Err(err) => {
                state.end_load();
                drop(state);
                self.report("Failed to load QR codes", &err);
                Err(err.into())
            }
        }
    }

    /// Fetch the batch list used by the move-target picker
    pub async fn load_batches(&self) -> Result<Vec<Node>, InventoryError> {
        match self.gateway.batches().await {
            Ok(batches) => {
                let mut state = self.state.borrow_mut();
                state.set_batches(batches);
                Ok(state.batch_folders())
            }
            Err(err) => {
                self.report("Failed to load batches", &err);
                Err(err.into())
            }
        }
    }

    /// QR codes of one batch as file nodes (not merged into the cache)
    pub async fn batch_contents(&self, batch_id: &str) -> Result<Vec<Node>, InventoryError> {
        let batch_id = ApiId::parse(batch_id);
        match self.gateway.batch_codes(&batch_id).await {
            Ok(codes) => Ok(self
                .state
                .borrow()
                .normalizer()
                .normalize_batch_codes(&batch_id, codes)),
            Err(err) => {
                self.report("Failed to load batch", &err);
                Err(err.into())
            }
        }
    }

    async fn send_move(&self, request: &MoveRequest, count: usize) -> Outcome {
        match self.gateway.move_codes(request).await {
            Ok(()) => {
                self.notify(Notice::success(format!("Moved {} QR code(s)", count)));
                // A failed reload already queued its own notice
                let _ = self.reload().await;
                Outcome::Done
            }
            Err(err) => {
                self.report("Failed to move QR codes", &err);
                Outcome::Failed
            }
        }
    }

    /// Drop the dragged node onto `target`
    pub async fn drop_on(&self, target: Option<&str>) -> Outcome {
        let planned = self.state.borrow().plan_drop(target);

        let outcome = match planned {
            Err(rejection) => {
                self.reject_drop(&rejection);
                Outcome::Rejected
            }
            Ok(plan) => {
                tracing::info!(
                    folder = %plan.target_folder_id,
                    count = plan.count(),
                    "dropping QR codes"
                );
                self.send_move(&plan.request, plan.count()).await
            }
        };

        self.state.borrow_mut().drag_end();
        outcome
    }

    fn reject_drop(&self, rejection: &DropRejection) {
        if rejection.is_silent() {
            tracing::debug!(%rejection, "drop ignored");
        } else {
            self.notify(Notice::info(rejection.to_string()));
        }
    }

    /// Move the selected codes (and direct children of selected folders)
    pub async fn move_selected(&self, target: MoveTarget) -> Outcome {
        let target = match target {
            MoveTarget::Batch(id) if id.trim().is_empty() => None,
            MoveTarget::NewBatch(name) if name.trim().is_empty() => None,
            MoveTarget::NewBatch(name) => Some(MoveTarget::NewBatch(name.trim().to_string())),
            other => Some(other),
        };
        let Some(target) = target else {
            self.notify(Notice::info("Choose a batch to move into"));
            return Outcome::Rejected;
        };

        let qr_ids = self.state.borrow().selected_file_ids();
        if qr_ids.is_empty() {
            self.notify(Notice::info("Select at least one QR code to move"));
            return Outcome::Rejected;
        }

        let count = qr_ids.len();
        let outcome = self.send_move(&MoveRequest::new(qr_ids, target), count).await;
        if outcome == Outcome::Done {
            self.state.borrow_mut().clear_selection();
        }
        outcome
    }

    /// Delete every selected code, one request at a time.
    ///
    /// The first failure stops the loop; the user only learns that some
    /// items may not have been deleted. The cache is reloaded either way.
    pub async fn delete_selected(&self, confirmed: bool) -> Outcome {
        if !confirmed {
            return Outcome::Rejected;
        }
        let qr_ids = self.state.borrow().selected_file_ids();
        if qr_ids.is_empty() {
            self.notify(Notice::info("Select at least one QR code to delete"));
            return Outcome::Rejected;
        }

        let total = qr_ids.len();
        let mut deleted = 0usize;
        let mut failure = None;
        for id in &qr_ids {
            if let Err(err) = self.gateway.delete_code(id).await {
                failure = Some(err);
                break;
            }
            deleted += 1;
        }

        let outcome = match failure {
            None => {
                self.notify(Notice::success(format!("Deleted {} QR code(s)", deleted)));
                self.state.borrow_mut().clear_selection();
                Outcome::Done
            }
            Some(GatewayError::Aborted) => {
                tracing::debug!(deleted, total, "bulk delete aborted");
                return Outcome::Failed;
            }
            Some(err) => {
                tracing::error!(%err, deleted, total, "bulk delete stopped");
                self.notify(Notice::error(
                    "Delete failed; some items may not have been deleted",
                ));
                Outcome::Failed
            }
        };

        let _ = self.reload().await;
        outcome
    }

    /// Generate a new batch of QR codes
    pub async fn generate_batch(&self, count: u32, name: &str) -> Outcome {
        let name = name.trim();
        if count == 0 || name.is_empty() {
            self.notify(Notice::info("Enter a batch name and a count of at least 1"));
            return Outcome::Rejected;
        }

        let request = GenerateRequest {
            count,
            name: name.to_string(),
        };
        match self.gateway.generate(&request).await {
            Ok(response) => {
                tracing::info!(batch = %response.batch_id, count, "batch generated");
                let message = format!("Generated {} QR code(s) in \"{}\"", count, name);
                self.notify(Notice::success(message));
                let _ = self.reload().await;
                Outcome::Done
            }
            Err(err) => {
                self.report("Failed to generate QR codes", &err);
                Outcome::Failed
            }
        }
    }

    /// Delete unassigned codes of one batch, or of every batch
    pub async fn purge_unmapped(&self, batch_id: Option<&str>) -> Outcome {
        let batch_id = batch_id.map(ApiId::parse);
        match self.gateway.delete_unmapped(batch_id.as_ref()).await {
            Ok(()) => {
                self.notify(Notice::success("Deleted unassigned QR codes"));
                let _ = self.reload().await;
                Outcome::Done
            }
            Err(err) => {
                self.report("Failed to delete unassigned QR codes", &err);
                Outcome::Failed
            }
        }
    }
}
