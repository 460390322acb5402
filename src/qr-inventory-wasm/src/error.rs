use wasm_bindgen::JsValue;

/// Failures talking to the QR admin API
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Request aborted")]
    Aborted,

    #[error("No browser window available")]
    NoWindow,
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Error types for the inventory engine
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Folder hierarchy contains a cycle at node {id}")]
    CycleDetected { id: String },

    #[error("Not a folder: {0}")]
    NotAFolder(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Page size must be at least 1")]
    InvalidPageSize,

    #[error("Print page capacity must be at least 1")]
    InvalidCapacity,

    #[error("Invalid input: {0}")]
    Decode(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

// Convert errors to JsValue for JavaScript
impl From<InventoryError> for JsValue {
    fn from(err: InventoryError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for InventoryError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        InventoryError::Decode(err.to_string())
    }
}

/// Render a thrown JS value for logs and notices
pub(crate) fn js_error_to_string(value: JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(&value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
