//! SVG rasterisation via resvg.
//!
//! ## Why spawn_blocking?
//!
//! Rendering a 128× icon can mean filling hundreds of megapixels. The work is
//! CPU-bound and synchronous, so [`export_image`] moves it onto Tokio's
//! blocking pool and the session stays responsive while it runs.
//!
//! The SVG is stretched to exactly the requested size, so a document whose
//! declared size differs from its parsed intrinsic size (e.g. `width="2cm"`)
//! still fills the whole canvas.

use crate::config::Rgb;
use crate::error::SvgScaleError;
use crate::output::ExportedImage;
use crate::pipeline::encode;
use crate::state::ExportRequest;
use image::RgbaImage;
use once_cell::sync::Lazy;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Largest RGBA canvas, in bytes, a single export may allocate.
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// System fonts, loaded once on first use; text elements need them.
static FONT_DB: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!("Loaded {} font faces", db.len());
    Arc::new(db)
});

/// Rasterise and encode `request` off the async executor.
pub async fn export_image(
    request: &ExportRequest,
    max_edge: u32,
) -> Result<ExportedImage, SvgScaleError> {
    let request = request.clone();

    tokio::task::spawn_blocking(move || export_image_blocking(&request, max_edge))
        .await
        .map_err(|e| SvgScaleError::Internal(format!("Export task panicked: {}", e)))?
}

/// Blocking implementation of [`export_image`].
fn export_image_blocking(
    request: &ExportRequest,
    max_edge: u32,
) -> Result<ExportedImage, SvgScaleError> {
    let name = request.source.name();

    let render_start = Instant::now();
    let pixels = rasterize(
        name,
        request.source.payload(),
        request.width,
        request.height,
        request.fill,
        encode::edge_limit(request.format, max_edge),
    )?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let encode_start = Instant::now();
    let bytes = encode::encode_image(name, &pixels, request.format, request.quality)?;
    let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

    info!(
        "Exported {} → {} ({}x{} {}, {} bytes)",
        name,
        request.output_name,
        request.width,
        request.height,
        request.format,
        bytes.len()
    );

    Ok(ExportedImage {
        file_name: request.output_name.clone(),
        format: request.format,
        mime_type: request.format.mime_type(),
        width: request.width,
        height: request.height,
        byte_len: bytes.len(),
        bytes,
        render_duration_ms,
        encode_duration_ms,
    })
}

/// Rasterise `svg` to a `width` × `height` straight-alpha RGBA buffer.
///
/// `fill` is painted first when given. Fails before allocating when either
/// edge exceeds `max_edge` or the canvas would exceed [`MAX_CANVAS_BYTES`].
pub fn rasterize(
    name: &str,
    svg: &str,
    width: u32,
    height: u32,
    fill: Option<Rgb>,
    max_edge: u32,
) -> Result<RgbaImage, SvgScaleError> {
    let failed = |detail: String| SvgScaleError::ExportFailure {
        name: name.to_string(),
        detail,
    };

    if width > max_edge || height > max_edge {
        return Err(failed(format!(
            "{width}x{height} exceeds the {max_edge} px edge limit; choose a smaller scale"
        )));
    }

    let canvas_bytes = u64::from(width) * u64::from(height) * 4;
    if canvas_bytes > MAX_CANVAS_BYTES {
        return Err(failed(format!(
            "{width}x{height} needs {canvas_bytes} bytes, over the {MAX_CANVAS_BYTES} byte canvas budget; choose a smaller scale"
        )));
    }

    let mut options = Options::default();
    options.fontdb = Arc::clone(&FONT_DB);
    let tree = Tree::from_str(svg, &options)
        .map_err(|e| failed(format!("failed to parse SVG: {e}")))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| failed(format!("cannot allocate a {width}x{height} canvas")))?;

    if let Some(c) = fill {
        pixmap.fill(Color::from_rgba8(c.r, c.g, c.b, 255));
    }

    let size = tree.size();
    let transform = Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    debug!("Rendered {} → {}x{} px", name, width, height);

    // tiny-skia stores premultiplied alpha; encoders expect straight alpha.
    demultiply_in_place(pixmap.data_mut());

    RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| failed("pixel buffer size mismatch".to_string()))
}

/// Un-premultiply RGBA8 pixels without a second buffer.
fn demultiply_in_place(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let alpha = u32::from(px[3]);
        if alpha == 0 || alpha == 255 {
            continue;
        }
        for channel in &mut px[..3] {
            *channel = ((u32::from(*channel) * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect x="0" y="0" width="2" height="4" fill="#ff0000"/></svg>"##;

    #[test]
    fn renders_at_scaled_size() {
        let img = rasterize("sq.svg", RED_SQUARE, 16, 16, None, 1024).unwrap();
        assert_eq!(img.dimensions(), (16, 16));
        // Left half is the red rect, right half untouched.
        assert_eq!(img.get_pixel(2, 8).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(13, 8).0[3], 0);
    }

    #[test]
    fn fill_is_painted_under_artwork() {
        let white = Some(Rgb::WHITE);
        let img = rasterize("sq.svg", RED_SQUARE, 4, 4, white, 1024).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn edge_limit_is_enforced() {
        let err = rasterize("sq.svg", RED_SQUARE, 2048, 8, None, 1024).unwrap_err();
        assert!(matches!(err, SvgScaleError::ExportFailure { .. }));
    }

    #[test]
    fn canvas_budget_is_checked_before_allocating() {
        // 32768² RGBA is 4 GiB; the edge limit alone would let it through.
        let err = rasterize("sq.svg", RED_SQUARE, 32_768, 32_768, None, 32_768).unwrap_err();
        match err {
            SvgScaleError::ExportFailure { detail, .. } => assert!(detail.contains("budget")),
            other => panic!("expected ExportFailure, got {other:?}"),
        }
    }

    #[test]
    fn demultiply_restores_straight_alpha() {
        let mut data = [128, 0, 0, 128, 0, 0, 0, 0, 10, 20, 30, 255];
        demultiply_in_place(&mut data);
        assert_eq!(data, [255, 0, 0, 128, 0, 0, 0, 0, 10, 20, 30, 255]);
    }

    #[test]
    fn unparseable_svg_fails_export() {
        let err = rasterize("bad.svg", "<svg", 4, 4, None, 1024).unwrap_err();
        assert!(matches!(err, SvgScaleError::ExportFailure { .. }));
    }
}
