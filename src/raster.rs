// src/raster.rs - SVG rasterization shared by frame overlays and charts
use image::RgbImage;
use once_cell::sync::Lazy;
use resvg::tiny_skia::{IntSize, Pixmap, Transform};
use tracing::debug;
use usvg::{fontdb, TreeParsing, TreeTextToPath};

use crate::error::{AnalysisError, AnalysisResult};

// Loading system fonts is slow, do it once per process.
static FONTS: Lazy<fontdb::Database> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!("Loaded {} font faces", db.len());
    db
});

fn parse(svg: &str) -> AnalysisResult<resvg::Tree> {
    let opt = usvg::Options::default();
    let mut tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| AnalysisError::render(format!("invalid svg: {}", e)))?;
    // Text without a matching font is dropped, never an error.
    tree.convert_text(&FONTS);
    Ok(resvg::Tree::from_usvg(&tree))
}

/// Rasterize an SVG document onto a fresh canvas.
pub fn render_svg(svg: &str, width: u32, height: u32) -> AnalysisResult<RgbImage> {
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| AnalysisError::render(format!("invalid canvas {}x{}", width, height)))?;
    parse(svg)?.render(Transform::default(), &mut pixmap.as_mut());
    pixmap_to_rgb(&pixmap)
}

/// Rasterize an SVG document on top of an existing image.
pub fn render_svg_over(svg: &str, base: &RgbImage) -> AnalysisResult<RgbImage> {
    let (width, height) = base.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| AnalysisError::render(format!("invalid canvas {}x{}", width, height)))?;

    // Opaque pixels are identical in premultiplied form.
    let rgba: Vec<u8> = base
        .pixels()
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();
    let mut pixmap = Pixmap::from_vec(rgba, size)
        .ok_or_else(|| AnalysisError::render("pixmap buffer size mismatch"))?;

    parse(svg)?.render(Transform::default(), &mut pixmap.as_mut());
    pixmap_to_rgb(&pixmap)
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> AnalysisResult<RgbImage> {
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
        .ok_or_else(|| AnalysisError::render("image buffer size mismatch"))
}

/// Escape text for use inside SVG markup.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
