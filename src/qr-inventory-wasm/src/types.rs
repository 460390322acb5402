use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a virtual filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Folder,
    File,
}

/// Whether a QR code is linked to a merchant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrStatus {
    Assigned,
    Active,
}

impl QrStatus {
    /// Lenient parse of a backend status string; unknown values carry no status
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "assigned" => Some(QrStatus::Assigned),
            "active" => Some(QrStatus::Active),
            _ => None,
        }
    }
}

/// Node of the virtual filesystem (folder, batch or QR code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QrStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_mobile: Option<String>,
}

impl Node {
    pub fn folder(id: impl Into<String>, name: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeType::Folder,
            parent_id: parent_id.map(str::to_string),
            size: String::new(),
            date: String::new(),
            color: None,
            url: None,
            status: None,
            merchant_name: None,
            merchant_mobile: None,
        }
    }

    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: Option<&str>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeType::File,
            parent_id: parent_id.map(str::to_string),
            size: String::new(),
            date: String::new(),
            color: None,
            url: Some(url.into()),
            status: None,
            merchant_name: None,
            merchant_mobile: None,
        }
    }

    #[inline]
    pub fn is_folder(&self) -> bool {
        self.kind == NodeType::Folder
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == NodeType::File
    }
}

/// Status filter applied on top of text search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Assigned,
    Active,
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "assigned" => StatusFilter::Assigned,
            "active" => StatusFilter::Active,
            _ => StatusFilter::All,
        }
    }
}

/// Filter criteria for the folder view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub query: String,
    pub status: StatusFilter,
}

/// Engine configuration supplied by the host page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub page_size: usize,
    pub print_page_capacity: usize,
    pub payload_base_url: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            auth_token: None,
            page_size: 10,
            print_page_capacity: 3,
            payload_base_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Backend identifier, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
    Number(i64),
    Text(String),
}

impl ApiId {
    /// Numeric-looking ids go back to the backend as JSON numbers
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(ApiId::Number)
            .unwrap_or_else(|_| ApiId::Text(raw.to_string()))
    }
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiId::Number(n) => write!(f, "{}", n),
            ApiId::Text(s) => f.write_str(s),
        }
    }
}

/// Entry of `GET /admin/qr/file-system`
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: ApiId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default, rename = "parentId", alias = "parent_id")]
    pub parent_id: Option<ApiId>,
    #[serde(default)]
    pub size: Option<serde_json::Value>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub merchant_mobile: Option<String>,
}

/// Entry of `GET /admin/qr/batches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    pub id: ApiId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Entry of `GET /admin/qr/batches/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct RawQrCode {
    pub id: ApiId,
    pub code: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub merchant_mobile: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub count: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub batch_id: ApiId,
}

/// Body of `POST /admin/qr/move`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRequest {
    pub qr_ids: Vec<ApiId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<ApiId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_batch_name: Option<String>,
}

/// Destination of a bulk move
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MoveTarget {
    Batch(String),
    NewBatch(String),
}

impl MoveRequest {
    pub fn new(qr_ids: Vec<ApiId>, target: MoveTarget) -> Self {
        match target {
            MoveTarget::Batch(id) => Self {
                qr_ids,
                batch_id: Some(ApiId::parse(&id)),
                new_batch_name: None,
            },
            MoveTarget::NewBatch(name) => Self {
                qr_ids,
                batch_id: None,
                new_batch_name: Some(name),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// User-facing toast message queued by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
