use crate::error::InventoryError;
use crate::selection::SelectionManager;
use crate::types::Node;
use serde::Serialize;
use smallvec::SmallVec;

/// QR cards per physical print page
pub const DEFAULT_PAGE_CAPACITY: usize = 3;

/// One card on a print page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintItem {
    pub id: String,
    pub name: String,
    pub payload: String,
}

impl PrintItem {
    /// Files without a payload cannot be printed
    pub fn from_node(node: &Node) -> Option<Self> {
        if !node.is_file() {
            return None;
        }
        let payload = node.url.as_ref().filter(|url| !url.is_empty())?;
        Some(Self {
            id: node.id.clone(),
            name: node.name.clone(),
            payload: payload.clone(),
        })
    }
}

/// One physical page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintPage {
    pub index: usize,
    pub items: SmallVec<[PrintItem; DEFAULT_PAGE_CAPACITY]>,
}

/// Order-preserving grouping of printable items into fixed-capacity pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintLayout {
    capacity: usize,
}

impl PrintLayout {
    pub fn new(capacity: usize) -> Result<Self, InventoryError> {
        if capacity == 0 {
            return Err(InventoryError::InvalidCapacity);
        }
        Ok(Self { capacity })
    }

    pub fn page_count(&self, items: usize) -> usize {
        items.div_ceil(self.capacity)
    }

    pub fn layout(&self, items: Vec<PrintItem>) -> Vec<PrintPage> {
        let mut pages = Vec::with_capacity(self.page_count(items.len()));
        let mut current: SmallVec<[PrintItem; DEFAULT_PAGE_CAPACITY]> = SmallVec::new();

        for item in items {
            current.push(item);
            if current.len() == self.capacity {
                pages.push(PrintPage {
                    index: pages.len(),
                    items: std::mem::take(&mut current),
                });
            }
        }
        if !current.is_empty() {
            pages.push(PrintPage {
                index: pages.len(),
                items: current,
            });
        }

        pages
    }
}

impl Default for PrintLayout {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PAGE_CAPACITY,
        }
    }
}

/// Items to print.
///
/// An explicit selection wins and may span folders (list order of
/// `all_nodes`). Without one, every printable file of the current filtered
/// folder listing is used.
pub fn printable_items(
    selection: &SelectionManager,
    all_nodes: &[Node],
    filtered_in_folder: &[&Node],
) -> Vec<PrintItem> {
    if !selection.is_empty() {
        return selection
            .ordered(all_nodes)
            .into_iter()
            .filter_map(PrintItem::from_node)
            .collect();
    }

    filtered_in_folder
        .iter()
        .filter_map(|node| PrintItem::from_node(node))
        .collect()
}
