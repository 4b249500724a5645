//! # svgscale
//!
//! Convert SVG images to PNG, JPEG or WebP at power-of-two scales.
//!
//! ## How it works
//!
//! The conversion workflow is a small finite state machine
//! ([`state`]): a file is submitted, parsed for its intrinsic size, then
//! the user picks a scale exponent (1× to 128×), a format, a quality and a
//! background before exporting. Every change goes through one pure
//! transition function, so the output filename and the effective fill are
//! always derived from the current settings instead of drifting.
//!
//! ```text
//! SVG
//!  │
//!  ├─ 1. Input   read the file, decode UTF-8
//!  ├─ 2. Parse   width/height or viewBox → intrinsic size
//!  ├─ 3. Choose  scale, format, quality, background (state machine)
//!  ├─ 4. Render  resvg → RGBA pixmap at intrinsic × 2^scale (spawn_blocking)
//!  └─ 5. Encode  PNG / JPEG / WebP bytes + derived filename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svgscale::{convert_to_file, ConversionConfig, ImageFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .scale(2)
//!         .format(ImageFormat::Jpeg)
//!         .quality(0.8)
//!         .build()?;
//!     let written = convert_to_file("logo.svg", ".", &config).await?;
//!     // ./logo (4x@q80).jpg
//!     println!("{}", written.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `svgscale` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! svgscale = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capability;
pub mod config;
pub mod convert;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capability::Capabilities;
pub use config::{Background, ConversionConfig, ConversionConfigBuilder, ImageFormat, Rgb};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file, inspect};
pub use error::{Failure, FailureKind, SvgScaleError};
pub use naming::{derive_filename, file_size_text};
pub use output::{ConversionOutput, ExportOutput, ExportedImage, PreviewSummary, SvgInfo};
pub use progress::{NoopObserver, SharedObserver, StateObserver};
pub use session::{Session, SnapshotStream};
pub use state::{transition, ConversionState, Event, LoadedImage, StateMachine, Ticket};
