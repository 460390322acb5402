use crate::selection::SelectionManager;
use crate::types::Node;
use serde::Serialize;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAction {
    Open,
    Move,
    Delete,
}

/// An open context menu
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenu {
    pub target_id: String,
    pub x: f64,
    pub y: f64,
    pub actions: SmallVec<[MenuAction; 3]>,
    /// Number of nodes a move/delete would apply to
    pub applies_to: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContextMenuState {
    open: Option<ContextMenu>,
}

impl ContextMenuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ContextMenu> {
        self.open.as_ref()
    }

    /// Right click on `node`. A node outside the selection first becomes
    /// the whole selection, so the menu never acts on a stale multi-select.
    pub fn open(
        &mut self,
        node: &Node,
        x: f64,
        y: f64,
        selection: &mut SelectionManager,
    ) -> &ContextMenu {
        selection.focus(&node.id);

        let mut actions = SmallVec::new();
        if node.is_folder() {
            actions.push(MenuAction::Open);
        }
        actions.push(MenuAction::Move);
        actions.push(MenuAction::Delete);

        self.open.insert(ContextMenu {
            target_id: node.id.clone(),
            x,
            y,
            actions,
            applies_to: selection.len(),
        })
    }

    pub fn dismiss(&mut self) -> bool {
        self.open.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_click_outside_selection_collapses() {
        let mut selection = SelectionManager::new();
        selection.click("1", true);
        selection.click("2", true);

        let mut menu = ContextMenuState::new();
        let node = Node::file("3", "QR-3", None, "p3");
        let opened = menu.open(&node, 10.0, 20.0, &mut selection);

        assert_eq!(opened.applies_to, 1);
        assert_eq!(selection.sorted_ids(), vec!["3"]);
    }

    #[test]
    fn test_right_click_inside_selection_keeps_it() {
        let mut selection = SelectionManager::new();
        selection.click("1", true);
        selection.click("2", true);

        let mut menu = ContextMenuState::new();
        let node = Node::file("2", "QR-2", None, "p2");
        let opened = menu.open(&node, 0.0, 0.0, &mut selection);

        assert_eq!(opened.applies_to, 2);
        assert_eq!(opened.actions.as_slice(), &[MenuAction::Move, MenuAction::Delete]);
    }

    #[test]
    fn test_only_folders_offer_open() {
        let mut selection = SelectionManager::new();
        let mut menu = ContextMenuState::new();

        let folder = menu.open(&Node::folder("batch_1", "B1", None), 0.0, 0.0, &mut selection);
        assert_eq!(
            folder.actions.as_slice(),
            &[MenuAction::Open, MenuAction::Move, MenuAction::Delete]
        );

        let node = Node::file("7", "QR-7", Some("batch_1"), "p7");
        let file = menu.open(&node, 0.0, 0.0, &mut selection);
        assert!(!file.actions.contains(&MenuAction::Open));
    }

    #[test]
    fn test_dismiss() {
        let mut selection = SelectionManager::new();
        let mut menu = ContextMenuState::new();
        assert!(!menu.dismiss());

        menu.open(&Node::folder("f", "F", None), 1.0, 1.0, &mut selection);
        assert!(menu.current().is_some());
        assert!(menu.dismiss());
        assert!(menu.current().is_none());
    }
}
