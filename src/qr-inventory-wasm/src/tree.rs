use crate::error::InventoryError;
use crate::types::Node;
use ahash::{AHashMap, AHashSet};
use smallvec::SmallVec;

/// Ancestor chain, root-most first
pub type Breadcrumbs<'a> = SmallVec<[&'a Node; 8]>;

/// Adjacency index over the flat node list, rebuilt once per fetch
#[derive(Debug, Default)]
pub struct TreeIndex {
    nodes: Vec<Node>,
    positions: AHashMap<String, usize>,
    roots: Vec<usize>,
    children: AHashMap<String, Vec<usize>>,
}

impl TreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index. Child lists keep source order.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut positions = AHashMap::with_capacity(nodes.len());
        let mut roots = Vec::new();
        let mut children: AHashMap<String, Vec<usize>> = AHashMap::new();

        for (idx, node) in nodes.iter().enumerate() {
            positions.insert(node.id.clone(), idx);
            match &node.parent_id {
                Some(parent) => children.entry(parent.clone()).or_default().push(idx),
                None => roots.push(idx),
            }
        }

        Self {
            nodes,
            positions,
            roots,
            children,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }


    /// All nodes in source order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.positions.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn is_folder(&self, id: &str) -> bool {
        self.get(id).map(Node::is_folder).unwrap_or(false)
    }

    /// Nodes whose `parent_id` equals `folder` (`None` = root)
    pub fn children_of<'a>(&'a self, folder: Option<&str>) -> impl Iterator<Item = &'a Node> + 'a {
        let slots: &[usize] = match folder {
            None => &self.roots,
            Some(id) => self.children.get(id).map(Vec::as_slice).unwrap_or(&[]),
        };
        slots.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Direct file children of a folder (not recursive)
    pub fn file_children<'a>(&'a self, folder: &str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children_of(Some(folder)).filter(|node| node.is_file())
    }

    /// Walk `parent_id` links upward from `folder`.
    ///
    /// A parent id that is not in the index counts as reaching root. A
    /// repeated id means the hierarchy is cyclic and is reported as an error.
    pub fn breadcrumbs<'a>(
        &'a self,
        folder: Option<&'a str>,
    ) -> Result<Breadcrumbs<'a>, InventoryError> {
        let mut chain: Breadcrumbs<'a> = SmallVec::new();
        let mut visited: AHashSet<&'a str> = AHashSet::new();
        let mut cursor = folder;

        while let Some(id) = cursor {
            let Some(node) = self.get(id) else {
                break;
            };
            if !visited.insert(node.id.as_str()) {
                return Err(InventoryError::CycleDetected { id: node.id.clone() });
            }
            chain.push(node);
            cursor = node.parent_id.as_deref();
        }

        chain.reverse();
        Ok(chain)
    }
}
