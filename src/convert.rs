//! One-shot conversion entry points.
//!
//! Each call drives a fresh [`Session`] through load → settings → export and
//! returns the result. Use a [`Session`] directly when the settings change
//! interactively or when state snapshots are needed.

use crate::config::ConversionConfig;
use crate::error::SvgScaleError;
use crate::output::{ConversionOutput, ExportOutput, SvgInfo};
use crate::pipeline::input::{self, Upload};
use crate::pipeline::parse;
use crate::session::Session;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert the SVG at `path` to an in-memory raster image.
///
/// # Errors
/// Returns the first failure: unsupported environment, unreadable file,
/// unusable dimensions, or a failed export.
///
/// # Example
/// ```rust,no_run
/// use svgscale::{convert, ConversionConfig, ImageFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().scale(3).format(ImageFormat::Png).build()?;
/// let output = convert("icon.svg", &config).await?;
/// std::fs::write(&output.image.file_name, &output.image.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SvgScaleError> {
    let path = path.as_ref();
    info!("Starting conversion: {}", path.display());
    let upload = input::read_path(path).await?;
    convert_upload(upload, config).await
}

/// Convert SVG bytes held in memory. `name` drives the output filename.
pub async fn convert_from_bytes(
    name: impl Into<String>,
    bytes: impl Into<Vec<u8>>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SvgScaleError> {
    convert_upload(Upload::new(name, bytes), config).await
}

/// Convert the SVG at `input` and write the result.
///
/// `output` may be a directory, in which case the derived filename
/// (e.g. `"logo (4x).png"`) is used inside it, or a file path. The write is
/// atomic (temp file + rename).
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ExportOutput, SvgScaleError> {
    let mut session = open_session(config)?;
    session.load_path(input).await?;
    apply_settings(&mut session, config);
    session.export_to(output).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SvgScaleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SvgScaleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Read an SVG's intrinsic dimensions and file size without rendering.
pub async fn inspect(path: impl AsRef<Path>) -> Result<SvgInfo, SvgScaleError> {
    let upload = input::read_path(path.as_ref()).await?;
    let dims = parse::parse_dimensions(&upload.name, upload.text()?)?;
    Ok(SvgInfo {
        size_bytes: upload.size(),
        size_text: upload.size_text(),
        name: upload.name,
        width: dims.width,
        height: dims.height,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_upload(
    upload: Upload,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SvgScaleError> {
    let total_start = Instant::now();
    let mut session = open_session(config)?;

    let name = upload.name.clone();
    let size_bytes = upload.size();
    let loaded = session.load_bytes(upload.name, upload.bytes)?;
    let info = SvgInfo {
        name,
        width: loaded.width(),
        height: loaded.height(),
        size_bytes,
        size_text: loaded.size_text().to_string(),
    };

    apply_settings(&mut session, config);
    let image = session.export().await?;

    info!(
        "Conversion complete: {} → {} in {}ms",
        info.name,
        image.file_name,
        total_start.elapsed().as_millis()
    );
    Ok(ConversionOutput { info, image })
}

/// A session that is ready to load, or the reason it cannot be.
fn open_session(config: &ConversionConfig) -> Result<Session, SvgScaleError> {
    let session = Session::new(config.clone());
    let caps = session.capabilities();
    if !caps.is_supported() {
        return Err(SvgScaleError::UnsupportedEnvironment {
            missing: caps.missing().join(", "),
        });
    }
    Ok(session)
}

fn apply_settings(session: &mut Session, config: &ConversionConfig) {
    if !session.apply_config(config) {
        debug!("Some settings were not applied: {:?}", config);
    }
}
