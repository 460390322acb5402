use crate::normalize::batch_id_from_folder;
use crate::tree::TreeIndex;
use crate::types::{ApiId, MoveRequest, MoveTarget, Node};

/// Why a drop did not turn into a move request
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DropRejection {
    #[error("Nothing is being dragged")]
    NothingDragged,

    #[error("No drop target")]
    NoTarget,

    #[error("Cannot drop an item onto itself")]
    SelfTarget,

    #[error("Dragged item no longer exists")]
    UnknownNode,

    #[error("Folder \"{0}\" has no QR codes to move")]
    EmptyFolder(String),

    #[error("QR codes can only be moved into a batch")]
    NotABatch,
}

impl DropRejection {
    /// Silent rejections are plain no-ops and never reach the user
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            DropRejection::NothingDragged | DropRejection::NoTarget | DropRejection::SelfTarget
        )
    }
}

/// Validated drop, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub request: MoveRequest,
    pub target_folder_id: String,
}

impl DropPlan {
    pub fn count(&self) -> usize {
        self.request.qr_ids.len()
    }
}

/// Transient drag state between dragstart and drop/dragend
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DragSession {
    dragged_id: Option<String>,
    drag_over_folder_id: Option<String>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragged_id(&self) -> Option<&str> {
        self.dragged_id.as_deref()
    }

    pub fn drag_over_folder_id(&self) -> Option<&str> {
        self.drag_over_folder_id.as_deref()
    }

    pub fn drag_start(&mut self, node: &Node) {
        self.dragged_id = Some(node.id.clone());
        self.drag_over_folder_id = None;
    }

    /// Only a folder other than the dragged node can be highlighted
    pub fn drag_over(&mut self, node: Option<&Node>) {
        self.drag_over_folder_id = match node {
            Some(target)
                if target.is_folder() && self.dragged_id.as_deref() != Some(target.id.as_str()) =>
            {
                Some(target.id.clone())
            }
            _ => None,
        };
    }

    /// Ends the session whether or not a drop happened
    pub fn drag_end(&mut self) {
        self.dragged_id = None;
        self.drag_over_folder_id = None;
    }

    /// Validate a drop onto `target` and build the move request.
    ///
    /// A dragged file moves alone; a dragged folder moves its direct file
    /// children. Only batch folders accept drops.
    pub fn plan_drop(
        &self,
        target: Option<&str>,
        tree: &TreeIndex,
    ) -> Result<DropPlan, DropRejection> {
        let dragged_id = self.dragged_id.as_deref().ok_or(DropRejection::NothingDragged)?;
        let target = target.ok_or(DropRejection::NoTarget)?;
        if target == dragged_id {
            return Err(DropRejection::SelfTarget);
        }

        let dragged = tree.get(dragged_id).ok_or(DropRejection::UnknownNode)?;
        let qr_ids: Vec<ApiId> = if dragged.is_file() {
            vec![ApiId::parse(&dragged.id)]
        } else {
            tree.file_children(&dragged.id)
                .map(|child| ApiId::parse(&child.id))
                .collect()
        };
        if qr_ids.is_empty() {
            return Err(DropRejection::EmptyFolder(dragged.name.clone()));
        }

        let batch_id = batch_id_from_folder(target).ok_or(DropRejection::NotABatch)?;

        Ok(DropPlan {
            request: MoveRequest::new(qr_ids, MoveTarget::Batch(batch_id.to_string())),
            target_folder_id: target.to_string(),
        })
    }
}
