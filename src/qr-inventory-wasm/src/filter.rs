use crate::types::{FilterCriteria, Node, QrStatus, StatusFilter};

/// Text search + status filtering over a folder's children
pub struct FilterEngine {
    criteria: FilterCriteria,
    needle: String,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            needle: String::new(),
        }
    }

    /// Returns true when the query actually changed
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.criteria.query == query {
            return false;
        }
        self.criteria.query = query.to_string();
        self.needle = query.trim().to_lowercase();
        true
    }

    /// Returns true when the status filter actually changed
    pub fn set_status(&mut self, status: StatusFilter) -> bool {
        if self.criteria.status == status {
            return false;
        }
        self.criteria.status = status;
        true
    }

    /// Apply filters, keeping input order
    pub fn apply_filters<'a, I>(&self, nodes: I) -> Vec<&'a Node>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        nodes
            .into_iter()
            .filter(|node| self.matches_criteria(node))
            .collect()
    }

    /// Fast filter check for a single node
    #[inline]
    pub fn matches_criteria(&self, node: &Node) -> bool {
        self.matches_status(node) && self.matches_search(node)
    }

    fn matches_status(&self, node: &Node) -> bool {
        let wanted = match self.criteria.status {
            StatusFilter::All => return true,
            StatusFilter::Assigned => QrStatus::Assigned,
            StatusFilter::Active => QrStatus::Active,
        };

        // Folders carry no status
        node.is_folder() || node.status == Some(wanted)
    }

    fn matches_search(&self, node: &Node) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        if contains_folded(&node.name, &self.needle) {
            return true;
        }
        if !node.is_file() {
            return false;
        }
        [&node.merchant_name, &node.merchant_mobile]
            .into_iter()
            .flatten()
            .any(|field| contains_folded(field, &self.needle))
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
