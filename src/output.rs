//! Result types returned by the session and the one-shot API.

use crate::config::ImageFormat;
use crate::state::LoadedImage;
use serde::Serialize;
use std::path::PathBuf;

/// An encoded raster image held in memory.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedImage {
    /// Derived download name, e.g. `"logo (4x).png"`.
    pub file_name: String,
    pub format: ImageFormat,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
    /// Encoded file contents.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Wall-clock time spent rasterising.
    pub render_duration_ms: u64,
    /// Wall-clock time spent encoding.
    pub encode_duration_ms: u64,
}

/// What [`crate::session::Session::export_to`] wrote to disk.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutput {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes_written: u64,
    /// Render + encode + write.
    pub duration_ms: u64,
}

/// Intrinsic facts about an SVG file, available without rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvgInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    /// e.g. `"1.5 kilobytes"`.
    pub size_text: String,
}

/// Result of [`crate::convert::convert`]: the source facts plus the image.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub info: SvgInfo,
    pub image: ExportedImage,
}

/// The values a preview shows for a loaded image.
///
/// This is the render adapter's view of a `Loaded` state: every label is
/// already resolved (quality reads "100%" for PNG, a transparent JPEG
/// background reads "#000000").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSummary {
    pub name: String,
    pub size_text: String,
    pub width: u32,
    pub height: u32,
    pub scale_factor: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub format: ImageFormat,
    pub quality_label: String,
    pub quality_adjustable: bool,
    pub background_label: String,
    pub can_reset_to_transparent: bool,
    pub output_name: String,
    pub processing: bool,
}

impl From<&LoadedImage> for PreviewSummary {
    fn from(image: &LoadedImage) -> Self {
        Self {
            name: image.source().name().to_string(),
            size_text: image.size_text().to_string(),
            width: image.width(),
            height: image.height(),
            scale_factor: image.scale_factor(),
            output_width: image.output_width(),
            output_height: image.output_height(),
            format: image.format(),
            quality_label: image.quality_label(),
            quality_adjustable: image.quality_adjustable(),
            background_label: image.background_label(),
            can_reset_to_transparent: image.can_reset_to_transparent(),
            output_name: image.output_name().to_string(),
            processing: image.is_processing(),
        }
    }
}
