//! Error types for the svgscale library.
//!
//! Two distinct types reflect two distinct consumers:
//!
//! * [`SvgScaleError`] — returned as `Err(..)` from the adapters and the
//!   top-level `convert*` functions. Carries structured context (paths, I/O
//!   sources) for logging and for the CLI.
//!
//! * [`Failure`] — the cloneable, serialisable payload stored inside
//!   [`crate::state::ConversionState::Error`]. It keeps only the failure kind
//!   and the message a user should see.
//!
//! Every `SvgScaleError` converts into a `Failure`, so an adapter can always
//! hand a caught error to the state machine without losing the category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Message shown when nothing more specific is known about a failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while processing the image. Reset and try again.";

/// All fatal errors returned by the svgscale library.
#[derive(Debug, Error)]
pub enum SvgScaleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("SVG file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file (or in-memory upload) could not be read as text.
    #[error("Failed to read '{name}': {detail}")]
    ReadFailure { name: String, detail: String },

    // ── SVG errors ────────────────────────────────────────────────────────
    /// The document is not well-formed XML or its root is not `<svg>`.
    #[error("'{name}' is not a valid SVG document: {detail}")]
    InvalidSvg { name: String, detail: String },

    /// `width`/`height` or `viewBox` is present but unusable.
    #[error("Invalid {attribute} value {value:?}: {detail}")]
    MalformedDimensions {
        attribute: &'static str,
        value: String,
        detail: String,
    },

    /// The root element declares neither `width`+`height` nor `viewBox`.
    #[error("The SVG root element has no width/height or viewBox attributes")]
    MissingDimensions,

    // ── Export errors ─────────────────────────────────────────────────────
    /// Rasterisation or encoding failed.
    #[error("Export of '{name}' failed: {detail}")]
    ExportFailure { name: String, detail: String },

    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session is not in a state where the operation makes sense.
    #[error("Cannot {operation} while the session is in the '{state}' state")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Required SVG/raster/encoder capabilities are missing.
    #[error("This environment lacks capabilities required for conversion: {missing}")]
    UnsupportedEnvironment { missing: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SvgScaleError {
    /// The category this error falls into once surfaced in the state machine.
    pub fn kind(&self) -> FailureKind {
        match self {
            SvgScaleError::FileNotFound { .. } | SvgScaleError::ReadFailure { .. } => {
                FailureKind::ReadFailure
            }
            SvgScaleError::InvalidSvg { .. } => FailureKind::InvalidSvg,
            SvgScaleError::MalformedDimensions { .. } => FailureKind::MalformedDimensions,
            SvgScaleError::MissingDimensions => FailureKind::MissingDimensions,
            SvgScaleError::ExportFailure { .. } | SvgScaleError::OutputWriteFailed { .. } => {
                FailureKind::ExportFailure
            }
            SvgScaleError::InvalidState { .. }
            | SvgScaleError::UnsupportedEnvironment { .. }
            | SvgScaleError::InvalidConfig(_)
            | SvgScaleError::Internal(_) => FailureKind::UnspecifiedFailure,
        }
    }
}

/// Category of a failure stored in the `Error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad viewBox token count, or a non-positive/unparseable dimension.
    MalformedDimensions,
    /// No width/height and no viewBox on the root element.
    MissingDimensions,
    /// The document could not be parsed as SVG at all.
    InvalidSvg,
    /// I/O error or abort while reading the source file.
    ReadFailure,
    /// Rasterisation or encoding failure.
    ExportFailure,
    /// Anything else.
    UnspecifiedFailure,
}

impl FailureKind {
    /// The user-facing message for this kind when no detail should be shown.
    pub fn default_message(self) -> &'static str {
        match self {
            FailureKind::MalformedDimensions => {
                "The uploaded image contains an invalid value for its size attributes \
(width, height or viewBox), so it cannot be processed. Reset and select a different image."
            }
            FailureKind::MissingDimensions => {
                "The uploaded image does not contain any information about width and height, \
so it cannot be processed. Reset and select a different image."
            }
            FailureKind::InvalidSvg => {
                "The uploaded file is not a valid SVG image. Reset and select a different image."
            }
            FailureKind::ReadFailure => {
                "There was an error while trying to read the input file. Reset and try again."
            }
            FailureKind::ExportFailure => {
                "There was an error while exporting the image. Reset and try again."
            }
            FailureKind::UnspecifiedFailure => GENERIC_FAILURE_MESSAGE,
        }
    }
}

/// A failure as held by the `Error` state: a kind plus a user-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The catch-all failure used by `Event::UnspecifiedError`.
    pub fn unspecified() -> Self {
        Self::new(FailureKind::UnspecifiedFailure, GENERIC_FAILURE_MESSAGE)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&SvgScaleError> for Failure {
    fn from(err: &SvgScaleError) -> Self {
        let kind = err.kind();
        let message = match err {
            // Diagnostics the user can act on keep their detail.
            SvgScaleError::FileNotFound { .. }
            | SvgScaleError::ReadFailure { .. }
            | SvgScaleError::ExportFailure { .. }
            | SvgScaleError::OutputWriteFailed { .. } => {
                format!("{} ({})", kind.default_message(), err)
            }
            SvgScaleError::MalformedDimensions { .. }
            | SvgScaleError::MissingDimensions
            | SvgScaleError::InvalidSvg { .. } => kind.default_message().to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        Self { kind, message }
    }
}

impl From<SvgScaleError> for Failure {
    fn from(err: SvgScaleError) -> Self {
        Failure::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_dimensions_display() {
        let e = SvgScaleError::MalformedDimensions {
            attribute: "viewBox",
            value: "0 0 0 50".into(),
            detail: "width must be positive".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("viewBox"), "got: {msg}");
        assert!(msg.contains("0 0 0 50"), "got: {msg}");
    }

    #[test]
    fn kinds_map_to_failure_categories() {
        assert_eq!(
            SvgScaleError::MissingDimensions.kind(),
            FailureKind::MissingDimensions
        );
        assert_eq!(
            SvgScaleError::FileNotFound {
                path: "a.svg".into()
            }
            .kind(),
            FailureKind::ReadFailure
        );
        assert_eq!(
            SvgScaleError::Internal("boom".into()).kind(),
            FailureKind::UnspecifiedFailure
        );
    }

    #[test]
    fn read_failure_keeps_detail_in_user_message() {
        let e = SvgScaleError::ReadFailure {
            name: "icon.svg".into(),
            detail: "stream did not contain valid UTF-8".into(),
        };
        let failure = Failure::from(&e);
        assert_eq!(failure.kind, FailureKind::ReadFailure);
        assert!(failure.message.contains("valid UTF-8"), "got: {}", failure.message);
    }

    #[test]
    fn internal_errors_fall_back_to_generic_message() {
        let failure = Failure::from(SvgScaleError::Internal("task panicked".into()));
        assert_eq!(failure.message, GENERIC_FAILURE_MESSAGE);
        assert_eq!(failure, Failure::unspecified());
    }
}
