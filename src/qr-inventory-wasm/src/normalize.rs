use crate::types::{ApiId, Node, NodeType, QrStatus, RawBatch, RawNode, RawQrCode};
use ahash::{AHashMap, AHashSet};

/// Prefix of folder ids that stand for backend batches
pub const BATCH_PREFIX: &str = "batch_";

/// Folder id of a backend batch (`batch_<id>`)
pub fn batch_folder_id(batch_id: &ApiId) -> String {
    format!("{}{}", BATCH_PREFIX, batch_id)
}

/// Backend batch id behind a `batch_<id>` folder id
pub fn batch_id_from_folder(folder_id: &str) -> Option<&str> {
    folder_id
        .strip_prefix(BATCH_PREFIX)
        .filter(|suffix| !suffix.is_empty())
}

/// Converts raw API records into uniform nodes
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    payload_base_url: Option<String>,
}

impl Normalizer {
    pub fn new(payload_base_url: Option<String>) -> Self {
        Self {
            payload_base_url: payload_base_url.filter(|base| !base.is_empty()),
        }
    }

    /// Normalize the flat file-system listing.
    ///
    /// Duplicate ids keep their first occurrence. Folder-only and file-only
    /// fields are stripped from the wrong kind, and folders without a size
    /// get their direct child count.
    pub fn normalize_file_system(&self, raw: Vec<RawNode>) -> Vec<Node> {
        let mut child_counts: AHashMap<String, usize> = AHashMap::new();
        for record in &raw {
            if let Some(parent) = &record.parent_id {
                *child_counts.entry(parent.to_string()).or_default() += 1;
            }
        }

        let mut seen: AHashSet<String> = AHashSet::with_capacity(raw.len());
        let mut nodes = Vec::with_capacity(raw.len());

        for record in raw {
            let id = record.id.to_string();
            if !seen.insert(id.clone()) {
                tracing::warn!(%id, "duplicate node id in file-system listing, keeping first");
                continue;
            }

            let name = record.name.unwrap_or_else(|| id.clone());
            let parent_id = record.parent_id.map(|parent| parent.to_string());
            let date = record.date.unwrap_or_default();

            let node = match record.kind {
                NodeType::Folder => {
                    let size = match record.size.as_ref().and_then(display_size) {
                        Some(size) => size,
                        None => count_label(child_counts.get(&id).copied().unwrap_or(0)),
                    };
                    Node {
                        size,
                        date,
                        color: record.color,
                        ..Node::folder(id, name, parent_id.as_deref())
                    }
                }
                NodeType::File => {
                    let status = record.status.as_deref().and_then(QrStatus::parse);
                    let (merchant_name, merchant_mobile) = merchant_fields(
                        status,
                        record.merchant_name,
                        record.merchant_mobile,
                    );
                    Node {
                        id,
                        name,
                        kind: NodeType::File,
                        parent_id,
                        size: record.size.as_ref().and_then(display_size).unwrap_or_default(),
                        date,
                        color: None,
                        url: record.url,
                        status,
                        merchant_name,
                        merchant_mobile,
                    }
                }
            };
            nodes.push(node);
        }

        nodes
    }

    /// Batches become root-level folders with `batch_<id>` ids
    pub fn normalize_batches(&self, batches: &[RawBatch]) -> Vec<Node> {
        batches
            .iter()
            .map(|batch| {
                let name = batch
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Batch {}", batch.id));
                Node {
                    size: batch.count.map(|count| count_label(count as usize)).unwrap_or_default(),
                    ..Node::folder(batch_folder_id(&batch.id), name, None)
                }
            })
            .collect()
    }

    /// QR records of one batch become file nodes inside its folder
    pub fn normalize_batch_codes(&self, batch_id: &ApiId, codes: Vec<RawQrCode>) -> Vec<Node> {
        let folder_id = batch_folder_id(batch_id);

        codes
            .into_iter()
            .map(|code| {
                let status = code.status.as_deref().and_then(QrStatus::parse);
                let (merchant_name, merchant_mobile) =
                    merchant_fields(status, code.merchant_name, code.merchant_mobile);
                let url = self.payload_for(&code.code);
                Node {
                    date: code.updated_at.unwrap_or_default(),
                    status,
                    merchant_name,
                    merchant_mobile,
                    ..Node::file(code.id.to_string(), code.code, Some(&folder_id), url)
                }
            })
            .collect()
    }

    /// Payload string encoded into the QR symbol for a raw code
    pub fn payload_for(&self, code: &str) -> String {
        match &self.payload_base_url {
            Some(base) => format!("{}{}", base, code),
            None => code.to_string(),
        }
    }
}

/// Merchant details only survive on assigned codes
fn merchant_fields(
    status: Option<QrStatus>,
    name: Option<String>,
    mobile: Option<String>,
) -> (Option<String>, Option<String>) {
    if status == Some(QrStatus::Assigned) {
        (
            name.filter(|n| !n.is_empty()),
            mobile.filter(|m| !m.is_empty()),
        )
    } else {
        (None, None)
    }
}

fn display_size(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> Vec<RawNode> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_file_system_normalization() {
        let nodes = Normalizer::default().normalize_file_system(raw(serde_json::json!([
            {"id": "batch_1", "name": "Batch 1", "type": "folder", "parentId": null,
             "color": "blue", "url": "ignored"},
            {"id": 10, "name": "QR-10", "type": "file", "parentId": "batch_1",
             "url": "https://pay/10", "status": "assigned", "merchant_name": "Shop",
             "merchant_mobile": "9876543210", "color": "red"},
            {"id": 11, "name": "QR-11", "type": "file", "parentId": "batch_1",
             "url": "https://pay/11", "status": "active", "merchant_name": "stale"}
        ])));

        assert_eq!(nodes.len(), 3);

        let folder = &nodes[0];
        assert!(folder.is_folder());
        assert_eq!(folder.url, None);
        assert_eq!(folder.color.as_deref(), Some("blue"));
        assert_eq!(folder.size, "2 items");

        let assigned = &nodes[1];
        assert_eq!(assigned.id, "10");
        assert_eq!(assigned.parent_id.as_deref(), Some("batch_1"));
        assert_eq!(assigned.color, None);
        assert_eq!(assigned.merchant_mobile.as_deref(), Some("9876543210"));

        let active = &nodes[2];
        assert_eq!(active.status, Some(QrStatus::Active));
        assert_eq!(active.merchant_name, None);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let nodes = Normalizer::default().normalize_file_system(raw(serde_json::json!([
            {"id": "a", "name": "first", "type": "folder"},
            {"id": "a", "name": "second", "type": "folder"}
        ])));

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "first");
    }

    #[test]
    fn test_batch_codes_become_files_in_batch_folder() {
        let normalizer = Normalizer::new(Some("https://openscore.example/pay/".to_string()));
        let codes: Vec<RawQrCode> = serde_json::from_value(serde_json::json!([
            {"id": 5, "code": "OS-0005", "status": "active", "updated_at": "2024-01-02"}
        ]))
        .unwrap();

        let nodes = normalizer.normalize_batch_codes(&ApiId::Number(9), codes);

        assert_eq!(nodes[0].parent_id.as_deref(), Some("batch_9"));
        assert_eq!(nodes[0].url.as_deref(), Some("https://openscore.example/pay/OS-0005"));
        assert_eq!(nodes[0].date, "2024-01-02");
        assert!(nodes[0].is_file());
    }

    #[test]
    fn test_batches_become_root_folders() {
        let batches: Vec<RawBatch> = serde_json::from_value(serde_json::json!([
            {"id": 3, "name": "Launch", "count": 1},
            {"id": "x"}
        ]))
        .unwrap();

        let nodes = Normalizer::default().normalize_batches(&batches);

        assert_eq!(nodes[0].id, "batch_3");
        assert_eq!(nodes[0].size, "1 item");
        assert_eq!(nodes[1].name, "Batch x");
        assert!(nodes.iter().all(|n| n.parent_id.is_none() && n.is_folder()));
    }

    #[test]
    fn test_batch_id_from_folder() {
        assert_eq!(batch_id_from_folder("batch_9"), Some("9"));
        assert_eq!(batch_id_from_folder("batch_"), None);
        assert_eq!(batch_id_from_folder("assigned"), None);
    }
}
