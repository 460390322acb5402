use std::path::PathBuf;
use image::{imageops, ImageFormat, Rgb, RgbImage};
use crate::cache::SheetCache;
use crate::symbol::QrSymbol;
use crate::types::{RenderedPage, SheetConfig, SheetError, SheetItem, SheetPage};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const CARD_BORDER: Rgb<u8> = Rgb([221, 221, 221]);
const BORDER_PX: u32 = 2;

/// Share of the card height taken by the branded header strip
const HEADER_RATIO: u32 = 6;

/// Default max cache size: 200MB
const MAX_CACHE_SIZE: u64 = 200 * 1024 * 1024;

/// Pixel rectangle on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CardRect {
    fn inset(&self, by: u32) -> CardRect {
        CardRect {
            x: self.x + by,
            y: self.y + by,
            width: self.width.saturating_sub(2 * by),
            height: self.height.saturating_sub(2 * by),
        }
    }
}

pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / 25.4 * dpi as f64).round() as u32
}

/// Page size in pixels at the configured DPI
pub fn page_size_px(config: &SheetConfig) -> (u32, u32) {
    (
        mm_to_px(config.page_width_mm, config.dpi),
        mm_to_px(config.page_height_mm, config.dpi),
    )
}

/// "#RRGGBB" (leading '#' optional)
pub fn parse_hex_color(raw: &str) -> Result<Rgb<u8>, SheetError> {
    let hex = raw.trim().trim_start_matches('#');
    let invalid = || SheetError::InvalidConfig(format!("brand color {:?} is not #RRGGBB", raw));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| invalid());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

pub fn validate_config(config: &SheetConfig) -> Result<(), SheetError> {
    if !(72..=1200).contains(&config.dpi) {
        return Err(SheetError::InvalidConfig(format!("dpi {} outside 72..=1200", config.dpi)));
    }
    if config.slots_per_page == 0 {
        return Err(SheetError::InvalidConfig("slots_per_page must be at least 1".to_string()));
    }
    if config.margin_mm < 0.0
        || config.page_width_mm <= 2.0 * config.margin_mm
        || config.page_height_mm <= 2.0 * config.margin_mm
    {
        return Err(SheetError::InvalidConfig("margins leave no printable area".to_string()));
    }
    if !matches!(config.format.to_lowercase().as_str(), "png" | "jpeg" | "jpg") {
        return Err(SheetError::InvalidConfig(format!("unsupported format: {}", config.format)));
    }
    parse_hex_color(&config.brand_color)?;
    Ok(())
}

/// Card slots top to bottom: equal horizontal bands inside the margins,
/// separated by half a margin
pub fn card_rects(config: &SheetConfig) -> Vec<CardRect> {
    let (width, height) = page_size_px(config);
    let margin = mm_to_px(config.margin_mm, config.dpi);
    let gutter = margin / 2;
    let band = height.saturating_sub(2 * margin) / config.slots_per_page.max(1);

    (0..config.slots_per_page)
        .map(|slot| CardRect {
            x: margin,
            y: margin + slot * band + gutter / 2,
            width: width.saturating_sub(2 * margin),
            height: band.saturating_sub(gutter),
        })
        .collect()
}

fn check_page(config: &SheetConfig, page: &SheetPage) -> Result<(), SheetError> {
    if page.items.is_empty() {
        return Err(SheetError::EmptyPage(page.index));
    }
    if page.items.len() > config.slots_per_page as usize {
        return Err(SheetError::PageOverflow {
            index: page.index,
            items: page.items.len(),
            slots: config.slots_per_page,
        });
    }
    Ok(())
}

fn fill(canvas: &mut RgbImage, rect: CardRect, color: Rgb<u8>) {
    let right = (rect.x + rect.width).min(canvas.width());
    let bottom = (rect.y + rect.height).min(canvas.height());
    for y in rect.y..bottom {
        for x in rect.x..right {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn draw_card(
    canvas: &mut RgbImage,
    card: CardRect,
    brand: Rgb<u8>,
    item: &SheetItem,
) -> Result<(), SheetError> {
    fill(canvas, card, CARD_BORDER);
    let inner = card.inset(BORDER_PX);
    fill(canvas, inner, WHITE);

    let header_height = inner.height / HEADER_RATIO;
    fill(canvas, CardRect { height: header_height, ..inner }, brand);

    let body = CardRect {
        y: inner.y + header_height,
        height: inner.height - header_height,
        ..inner
    };
    let side = body.width.min(body.height) * 9 / 10;
    let symbol = QrSymbol::encode(&item.payload)?.render(side)?;

    let x = body.x + (body.width - symbol.width()) / 2;
    let y = body.y + (body.height - symbol.height()) / 2;
    imageops::overlay(canvas, &symbol, x as i64, y as i64);
    Ok(())
}

/// Paint one page. Unused slots stay blank.
pub fn draw_page(config: &SheetConfig, page: &SheetPage) -> Result<RgbImage, SheetError> {
    check_page(config, page)?;
    let brand = parse_hex_color(&config.brand_color)?;
    let (width, height) = page_size_px(config);
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);

    for (card, item) in card_rects(config).into_iter().zip(&page.items) {
        draw_card(&mut canvas, card, brand, item)?;
    }
    Ok(canvas)
}

/// Encode image to target format
pub fn encode_image(config: &SheetConfig, image: &RgbImage) -> Result<Vec<u8>, SheetError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    match config.format.to_lowercase().as_str() {
        "jpeg" | "jpg" => {
            let quality = config.jpeg_quality.clamp(1, 100);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
            image.write_with_encoder(encoder)?;
        }
        "png" => {
            image.write_to(&mut cursor, ImageFormat::Png)?;
        }
        other => {
            return Err(SheetError::InvalidConfig(format!("unsupported format: {}", other)));
        }
    }

    Ok(buffer)
}

/// Print sheet renderer backed by a disk cache
pub struct SheetRenderer {
    config: SheetConfig,
    cache: SheetCache,
}

impl SheetRenderer {
    pub fn new(cache_dir: PathBuf, config: Option<SheetConfig>) -> Result<Self, SheetError> {
        let config = config.unwrap_or_default();
        validate_config(&config)?;
        Ok(Self {
            config,
            cache: SheetCache::new(cache_dir, MAX_CACHE_SIZE),
        })
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub async fn initialize(&self) -> Result<(), SheetError> {
        self.cache.initialize().await
    }

    fn extension(&self) -> &'static str {
        match self.config.format.to_lowercase().as_str() {
            "jpeg" | "jpg" => "jpg",
            _ => "png",
        }
    }

    /// Page index is excluded: identical content renders identically
    pub fn cache_key(&self, page: &SheetPage) -> Result<String, SheetError> {
        let layout =
            serde_json::to_vec(&self.config).map_err(|e| SheetError::Cache(e.to_string()))?;
        let payloads: Vec<&str> = page.items.iter().map(|item| item.payload.as_str()).collect();
        Ok(SheetCache::cache_key(&layout, &payloads))
    }

    /// Render one page, reusing a cached image when the content matches
    pub async fn render(&self, page: &SheetPage) -> Result<RenderedPage, SheetError> {
        check_page(&self.config, page)?;
        let key = self.cache_key(page)?;
        let (width, height) = page_size_px(&self.config);
        let format = self.extension();

        if let Some(cached_path) = self.cache.get(&key, format).await {
            let file_size = tokio::fs::metadata(&cached_path)
                .await
                .map(|m| m.len() as i64)
                .unwrap_or(0);
            tracing::debug!(page = page.index, "sheet served from cache");
            return Ok(RenderedPage {
                index: page.index,
                success: true,
                sheet_path: Some(cached_path.to_string_lossy().to_string()),
                width,
                height,
                format: format.to_string(),
                file_size,
                cached: true,
                error: None,
            });
        }

        // Painting is CPU bound; keep it off the async workers
        let config = self.config.clone();
        let owned = page.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let image = draw_page(&config, &owned)?;
            encode_image(&config, &image)
        })
        .await
        .map_err(|e| SheetError::Image(e.to_string()))??;

        let path = self.cache.put(&key, format, &encoded).await?;
        tracing::info!(
            page = page.index,
            items = page.items.len(),
            bytes = encoded.len(),
            "sheet rendered"
        );

        Ok(RenderedPage {
            index: page.index,
            success: true,
            sheet_path: Some(path.to_string_lossy().to_string()),
            width,
            height,
            format: format.to_string(),
            file_size: encoded.len() as i64,
            cached: false,
            error: None,
        })
    }

    /// Render every page; a failing page is reported in place and does
    /// not stop the rest
    pub async fn render_pages(&self, pages: &[SheetPage]) -> Vec<RenderedPage> {
        let mut results = Vec::with_capacity(pages.len());
        for page in pages {
            let result = match self.render(page).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(page = page.index, error = %e, "sheet render failed");
                    RenderedPage::failed(page.index, self.extension(), e.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    /// Cached path for a page, without rendering
    pub async fn sheet_path(&self, page: &SheetPage) -> Option<String> {
        let key = self.cache_key(page).ok()?;
        self.cache
            .get(&key, self.extension())
            .await
            .map(|p| p.to_string_lossy().to_string())
    }

    pub async fn clear_cache(&self) -> Result<(), SheetError> {
        self.cache.clear_all().await
    }

    pub async fn cache_stats(&self) -> Result<(i32, i64, String), SheetError> {
        let (count, size) = self.cache.stats().await?;
        let cache_dir = self.cache.cache_dir().to_string_lossy().to_string();
        Ok((count, size, cache_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_page(index: u32, count: usize) -> SheetPage {
        SheetPage {
            index,
            items: (0..count)
                .map(|i| SheetItem {
                    id: i.to_string(),
                    name: format!("QR-{}", i),
                    payload: format!("https://openscore.example/qr/OS-{:04}", i),
                })
                .collect(),
        }
    }

    #[test]
    fn test_a4_at_150_dpi() {
        let config = SheetConfig::default();
        assert_eq!(page_size_px(&config), (1240, 1754));
        assert_eq!(mm_to_px(10.0, 150), 59);
    }

    #[test]
    fn test_card_rects_stack_inside_margins() {
        let config = SheetConfig::default();
        let rects = card_rects(&config);
        let (width, height) = page_size_px(&config);

        assert_eq!(rects.len(), 3);
        for pair in rects.windows(2) {
            assert!(pair[0].y + pair[0].height < pair[1].y, "cards must not touch");
            assert_eq!(pair[0].height, pair[1].height);
        }
        let last = rects[2];
        assert!(last.y + last.height <= height - 59);
        assert_eq!(last.x + last.width, width - 59);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#0B5FFF").unwrap(), Rgb([0x0B, 0x5F, 0xFF]));
        assert_eq!(parse_hex_color("ff0000").unwrap(), Rgb([255, 0, 0]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&SheetConfig::default()).is_ok());

        let bad = [
            SheetConfig { dpi: 10, ..Default::default() },
            SheetConfig { slots_per_page: 0, ..Default::default() },
            SheetConfig { margin_mm: 200.0, ..Default::default() },
            SheetConfig { format: "webp".to_string(), ..Default::default() },
            SheetConfig { brand_color: "blue".to_string(), ..Default::default() },
        ];
        for config in bad {
            let result = validate_config(&config);
            assert!(matches!(result, Err(SheetError::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_draw_rejects_empty_and_overflowing_pages() {
        let config = SheetConfig::default();
        let empty = draw_page(&config, &create_test_page(0, 0));
        assert!(matches!(empty, Err(SheetError::EmptyPage(0))));
        assert!(matches!(
            draw_page(&config, &create_test_page(4, 4)),
            Err(SheetError::PageOverflow { index: 4, items: 4, slots: 3 })
        ));
    }

    #[test]
    fn test_draw_brands_used_slots_only() {
        let config = SheetConfig::default();
        let image = draw_page(&config, &create_test_page(0, 2)).unwrap();
        let rects = card_rects(&config);
        let brand = parse_hex_color(&config.brand_color).unwrap();

        for rect in &rects[..2] {
            let header = image.get_pixel(rect.x + rect.width / 2, rect.y + BORDER_PX + 2);
            assert_eq!(*header, brand);
            assert_eq!(*image.get_pixel(rect.x, rect.y), CARD_BORDER);
        }

        let unused = rects[2];
        assert_eq!(*image.get_pixel(unused.x + unused.width / 2, unused.y + 4), WHITE);
    }

    #[test]
    fn test_encode_png_and_jpeg() {
        let image = RgbImage::from_pixel(8, 8, WHITE);

        let png = encode_image(&SheetConfig::default(), &image).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let jpeg_config = SheetConfig { format: "jpeg".to_string(), ..Default::default() };
        let jpeg = encode_image(&jpeg_config, &image).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_cache_key_ignores_index_but_not_content() {
        let renderer = SheetRenderer::new(PathBuf::from("/tmp/unused"), None).unwrap();
        let page = create_test_page(0, 3);
        let same_content = SheetPage { index: 7, ..page.clone() };

        assert_eq!(renderer.cache_key(&page).unwrap(), renderer.cache_key(&same_content).unwrap());
        let shorter = create_test_page(0, 2);
        assert_ne!(renderer.cache_key(&page).unwrap(), renderer.cache_key(&shorter).unwrap());
    }

    #[tokio::test]
    async fn test_render_then_hit_cache() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = SheetRenderer::new(temp_dir.path().to_path_buf(), None).unwrap();
        renderer.initialize().await.unwrap();

        let page = create_test_page(0, 3);
        assert!(renderer.sheet_path(&page).await.is_none());

        let first = renderer.render(&page).await.unwrap();
        assert!(first.success && !first.cached);
        assert_eq!((first.width, first.height), (1240, 1754));

        let second = renderer.render(&page).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.sheet_path, first.sheet_path);

        let (count, size, _) = renderer.cache_stats().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(size, first.file_size);

        renderer.clear_cache().await.unwrap();
        assert_eq!(renderer.cache_stats().await.unwrap().0, 0);
    }

    #[tokio::test]
    async fn test_render_pages_reports_failures_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = SheetRenderer::new(temp_dir.path().to_path_buf(), None).unwrap();
        renderer.initialize().await.unwrap();

        let pages = vec![create_test_page(0, 1), create_test_page(1, 0), create_test_page(2, 5)];
        let results = renderer.render_pages(&pages).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].error.as_deref().unwrap_or_default().contains("slots"));
    }
}
