use image::{Rgb, RgbImage};
use qrcode::{Color, EcLevel, QrCode};
use crate::types::SheetError;

/// Light modules around the symbol required by scanners
pub const QUIET_ZONE: usize = 4;

const DARK: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT: Rgb<u8> = Rgb([255, 255, 255]);

/// Encoded QR matrix for one payload
#[derive(Debug, Clone)]
pub struct QrSymbol {
    width: usize,
    dark: Vec<bool>,
}

impl QrSymbol {
    /// Encode at error-correction level M
    pub fn encode(payload: &str) -> Result<Self, SheetError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M).map_err(|e| {
            SheetError::Encode {
                payload: payload.to_string(),
                reason: e.to_string(),
            }
        })?;

        let width = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();

        Ok(Self { width, dark })
    }

    /// Modules per side, without quiet zone
    pub fn width(&self) -> usize {
        self.width
    }

    /// Modules per side including the quiet zone on both edges
    pub fn total_width(&self) -> usize {
        self.width + 2 * QUIET_ZONE
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    /// Paint the largest whole-pixel-per-module image that fits `max_side`
    pub fn render(&self, max_side: u32) -> Result<RgbImage, SheetError> {
        let total = self.total_width() as u32;
        let module_px = max_side / total;
        if module_px == 0 {
            return Err(SheetError::Image(format!(
                "{} px cannot fit a {}-module symbol",
                max_side, total
            )));
        }

        let side = module_px * total;
        let mut image = RgbImage::from_pixel(side, side, LIGHT);
        let offset = QUIET_ZONE as u32 * module_px;

        for y in 0..self.width {
            for x in 0..self.width {
                if !self.is_dark(x, y) {
                    continue;
                }
                let left = offset + x as u32 * module_px;
                let top = offset + y as u32 * module_px;
                for py in top..top + module_px {
                    for px in left..left + module_px {
                        image.put_pixel(px, py, DARK);
                    }
                }
            }
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_short_payload() {
        let symbol = QrSymbol::encode("https://openscore.example/qr/OS-0001").unwrap();
        assert!(symbol.width() >= 21);
        assert_eq!((symbol.width() - 17) % 4, 0, "QR widths are 17 + 4 * version");
        assert_eq!(symbol.total_width(), symbol.width() + 8);
    }

    #[test]
    fn test_finder_pattern_corner_is_dark() {
        let symbol = QrSymbol::encode("OS-1").unwrap();
        assert!(symbol.is_dark(0, 0));
        assert!(symbol.is_dark(symbol.width() - 1, 0));
        assert!(!symbol.is_dark(symbol.width(), 0));
    }

    #[test]
    fn test_render_keeps_quiet_zone_light() {
        let symbol = QrSymbol::encode("OS-1").unwrap();
        let image = symbol.render(300).unwrap();

        let module_px = image.width() / symbol.total_width() as u32;
        assert!(module_px >= 1);
        assert_eq!(image.width() % symbol.total_width() as u32, 0);
        assert_eq!(*image.get_pixel(0, 0), LIGHT);

        let first = QUIET_ZONE as u32 * module_px;
        assert_eq!(*image.get_pixel(first, first), DARK);
        assert_eq!(*image.get_pixel(first - 1, first - 1), LIGHT);
    }

    #[test]
    fn test_render_too_small() {
        let symbol = QrSymbol::encode("OS-1").unwrap();
        assert!(matches!(symbol.render(10), Err(SheetError::Image(_))));
    }
}
