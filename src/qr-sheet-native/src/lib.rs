#![deny(clippy::all)]

use napi_derive::napi;
use std::path::PathBuf;
use std::sync::Arc;

mod cache;
mod renderer;
mod symbol;
mod types;

use renderer::SheetRenderer as InnerRenderer;
use types::{CacheStats, RenderedPage, SheetConfig, SheetPage};

/// SheetRendererNative - paints QR print pages to image files
#[napi]
pub struct SheetRendererNative {
    renderer: Arc<InnerRenderer>,
}

#[napi]
impl SheetRendererNative {
    /// Create a new renderer
    ///
    /// # Arguments
    /// * `cache_dir` - Optional cache directory path. Defaults to system temp dir
    /// * `config` - Optional sheet layout; A4, 150 DPI, three cards per page by default
    #[napi(constructor)]
    pub fn new(cache_dir: Option<String>, config: Option<SheetConfig>) -> napi::Result<Self> {
        let cache_path = cache_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("openscore_qr_sheets"));

        let renderer = InnerRenderer::new(cache_path, config)?;
        tracing::debug!(config = ?renderer.config(), "sheet renderer created");

        Ok(Self {
            renderer: Arc::new(renderer),
        })
    }

    /// Create the cache directory
    #[napi]
    pub async fn initialize(&self) -> napi::Result<()> {
        self.renderer.initialize().await?;
        Ok(())
    }

    /// Render a single page; rejects empty pages and pages with more
    /// items than slots
    #[napi]
    pub async fn render_page(&self, page: SheetPage) -> napi::Result<RenderedPage> {
        Ok(self.renderer.render(&page).await?)
    }

    /// Render every page; failures are reported per page
    #[napi]
    pub async fn render_pages(&self, pages: Vec<SheetPage>) -> napi::Result<Vec<RenderedPage>> {
        Ok(self.renderer.render_pages(&pages).await)
    }

    /// Cached image path for a page (doesn't render)
    #[napi]
    pub async fn get_sheet_path(&self, page: SheetPage) -> napi::Result<Option<String>> {
        Ok(self.renderer.sheet_path(&page).await)
    }

    /// Clear sheet cache
    #[napi]
    pub async fn clear_cache(&self) -> napi::Result<()> {
        self.renderer.clear_cache().await?;
        Ok(())
    }

    /// Get cache statistics
    #[napi]
    pub async fn get_cache_stats(&self) -> napi::Result<CacheStats> {
        let (count, size, dir) = self.renderer.cache_stats().await?;

        Ok(CacheStats {
            total_sheets: count,
            total_size_bytes: size,
            cache_dir: dir,
        })
    }
}

/// Default sheet layout, for hosts that want to tweak one field
#[napi]
pub fn default_sheet_config() -> SheetConfig {
    SheetConfig::default()
}

/// Install stderr logging. `filter` uses `RUST_LOG` syntax and falls back
/// to the `RUST_LOG` variable, then `info`. Returns false if logging was
/// already installed.
#[napi]
pub fn init_logging(filter: Option<String>) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
