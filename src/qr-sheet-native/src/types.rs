use napi_derive::napi;
use serde::{Deserialize, Serialize};

/// Physical layout of a printed QR sheet
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    pub dpi: u32,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub slots_per_page: u32,
    pub margin_mm: f64,
    pub brand_color: String, // "#RRGGBB"
    pub format: String,      // "png" or "jpeg"
    pub jpeg_quality: u8,    // 1-100
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            slots_per_page: 3,
            margin_mm: 10.0,
            brand_color: "#0B5FFF".to_string(),
            format: "png".to_string(),
            jpeg_quality: 90,
        }
    }
}

/// One QR card to print
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetItem {
    pub id: String,
    pub name: String,
    pub payload: String,
}

/// One physical page as laid out by the inventory engine
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetPage {
    pub index: u32,
    pub items: Vec<SheetItem>,
}

/// Result of rendering one page
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    pub index: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_path: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub file_size: i64,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderedPage {
    pub fn failed(index: u32, format: &str, error: String) -> Self {
        Self {
            index,
            success: false,
            sheet_path: None,
            width: 0,
            height: 0,
            format: format.to_string(),
            file_size: 0,
            cached: false,
            error: Some(error),
        }
    }
}

/// Cache statistics
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_sheets: i32,
    pub total_size_bytes: i64,
    pub cache_dir: String,
}

/// Error types for sheet rendering
#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error("QR encoding failed for {payload:?}: {reason}")]
    Encode { payload: String, reason: String },

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid sheet config: {0}")]
    InvalidConfig(String),

    #[error("Page {0} has no items")]
    EmptyPage(u32),

    #[error("Page {index} has {items} items but only {slots} slots")]
    PageOverflow { index: u32, items: usize, slots: u32 },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for SheetError {
    fn from(err: image::ImageError) -> Self {
        SheetError::Image(err.to_string())
    }
}

// Convert SheetError to napi::Error for JavaScript
impl From<SheetError> for napi::Error {
    fn from(err: SheetError) -> Self {
        napi::Error::from_reason(err.to_string())
    }
}
