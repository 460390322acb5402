use crate::types::Node;
use ahash::AHashSet;

/// Set of selected node ids
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionManager {
    selected: AHashSet<String>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click on a node.
    ///
    /// Without a modifier the click replaces the selection, and re-clicking
    /// the sole selected node clears it. With ctrl/cmd/shift held the id is
    /// toggled in or out of the existing selection.
    pub fn click(&mut self, id: &str, modifier: bool) {
        if modifier {
            if !self.selected.remove(id) {
                self.selected.insert(id.to_string());
            }
            return;
        }

        let sole = self.selected.len() == 1 && self.selected.contains(id);
        self.selected.clear();
        if !sole {
            self.selected.insert(id.to_string());
        }
    }

    /// Select everything visible, or clear when everything visible is already selected
    pub fn toggle_select_all<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let visible: AHashSet<String> = visible.into_iter().map(str::to_string).collect();
        if self.selected.len() == visible.len() {
            self.selected.clear();
        } else {
            self.selected = visible;
        }
    }

    /// Collapse onto `id` unless it is already part of the selection
    pub fn focus(&mut self, id: &str) {
        if !self.selected.contains(id) {
            self.selected.clear();
            self.selected.insert(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop ids that no longer exist after a reload
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.selected.retain(|id| keep(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected nodes in list order
    pub fn ordered<'a>(&self, nodes: &'a [Node]) -> Vec<&'a Node> {
        nodes
            .iter()
            .filter(|node| self.selected.contains(&node.id))
            .collect()
    }

    /// Selected ids sorted, for stable output
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }
}
