//! Fonts and text drawing for the built-in painters.
//!
//! Font lookup order: `report.font_path`, then the first readable system
//! font with CJK coverage, then the bundled DejaVu Sans (Latin only, so
//! Chinese names render as empty boxes).

use crate::error::{Error, Result};
use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;

const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Common CJK font locations on Linux, macOS and Windows.
pub const SYSTEM_FONT_CANDIDATES: [&str; 8] = [
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/simhei.ttf",
];

const ELLIPSIS: &str = "...";

/// The font compiled into the crate.
pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map_err(|e| Error::Config(format!("bundled font is unreadable: {e}")))
}

/// Load a font file. Collections (`.ttc`) use their first face.
pub fn load_font(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Config(format!("failed to read font {:?}: {}", path, e)))?;
    FontArc::try_from_vec(data).map_err(|e| Error::Config(format!("invalid font {:?}: {}", path, e)))
}

/// Pick the report font. A configured path must load; system candidates
/// are skipped when missing or unreadable.
pub fn resolve_font(configured: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = configured {
        return load_font(path);
    }

    for candidate in SYSTEM_FONT_CANDIDATES {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match load_font(path) {
            Ok(font) => {
                tracing::debug!(font = candidate, "Using system font");
                return Ok(font);
            }
            Err(e) => tracing::warn!(font = candidate, error = %e, "Skipping unusable font"),
        }
    }

    tracing::warn!("No CJK font found; set report.font_path to render Chinese text");
    bundled_font()
}

/// Width and height of `text` set at `size` pixels.
pub fn measure(font: &FontArc, size: f32, text: &str) -> (u32, u32) {
    text_size(PxScale::from(size), font, text)
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn draw(canvas: &mut RgbaImage, font: &FontArc, size: f32, x: i32, y: i32, color: Rgba<u8>, text: &str) {
    draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text);
}

/// Draw `text` centered on `center_x`, kept inside the canvas.
pub fn draw_centered(
    canvas: &mut RgbaImage,
    font: &FontArc,
    size: f32,
    center_x: i32,
    y: i32,
    color: Rgba<u8>,
    text: &str,
) {
    let (width, _) = measure(font, size, text);
    let max_x = (canvas.width() as i32 - width as i32).max(0);
    let x = (center_x - width as i32 / 2).clamp(0, max_x);
    draw(canvas, font, size, x, y, color, text);
}

/// `text`, shortened with an ellipsis until it fits in `max_width`.
pub fn fit(font: &FontArc, size: f32, text: &str, max_width: u32) -> String {
    if measure(font, size, text).0 <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + ELLIPSIS;
        if measure(font, size, &candidate).0 <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Fill a rectangle, clipped to the canvas. Empty rectangles are a no-op.
pub fn fill_rect(canvas: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width, height), color);
}
