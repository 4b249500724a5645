//! Image encoding: straight-alpha RGBA pixels → PNG, JPEG or WebP bytes.
//!
//! PNG is lossless and keeps the alpha channel. JPEG has no alpha, so pixels
//! are composited over black before encoding; the state machine already
//! supplies a black fill for transparent JPEG exports, so this only matters
//! for callers that hand in raw buffers. WebP is encoded lossy through
//! libwebp so the quality setting is honoured.

use crate::config::ImageFormat;
use crate::error::SvgScaleError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::debug;

/// Largest edge libwebp accepts.
pub const WEBP_MAX_EDGE: u32 = 16_383;

/// Longest edge `format` can be encoded at, capped by `max_edge`.
pub fn edge_limit(format: ImageFormat, max_edge: u32) -> u32 {
    match format {
        ImageFormat::Webp => max_edge.min(WEBP_MAX_EDGE),
        ImageFormat::Png | ImageFormat::Jpeg => max_edge,
    }
}

/// Encode `image` as `format`. `quality` is in `[0, 1]` and is ignored for PNG.
pub fn encode_image(
    name: &str,
    image: &RgbaImage,
    format: ImageFormat,
    quality: f64,
) -> Result<Vec<u8>, SvgScaleError> {
    let failed = |detail: String| SvgScaleError::ExportFailure {
        name: name.to_string(),
        detail,
    };
    let (width, height) = image.dimensions();
    let mut buf = Vec::new();

    match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut buf)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| failed(format!("PNG encoding failed: {e}")))?;
        }
        ImageFormat::Jpeg => {
            let rgb = flatten_over_black(image);
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| failed(format!("JPEG encoding failed: {e}")))?;
        }
        ImageFormat::Webp => {
            let encoded = webp::Encoder::from_rgba(image.as_raw(), width, height)
                .encode_simple(false, webp_quality(quality))
                .map_err(|e| failed(format!("WebP encoding failed: {e:?}")))?;
            buf.extend_from_slice(&encoded);
        }
    }

    debug!("Encoded {} as {} → {} bytes", name, format, buf.len());
    Ok(buf)
}

/// `data:image/svg+xml;base64,…` form of an SVG document.
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// JPEG encoder quality: `round(q × 100)` in `1..=100`.
fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// libwebp quality factor in `0.0..=100.0`.
fn webp_quality(quality: f64) -> f32 {
    (quality * 100.0).clamp(0.0, 100.0) as f32
}

fn flatten_over_black(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.as_raw().len() / 4 * 3);
    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        for c in [r, g, b] {
            rgb.push(((u16::from(c) * a + 127) / 255) as u8);
        }
    }
    rgb
}
