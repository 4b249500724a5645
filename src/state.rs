//! The conversion workflow as a finite state machine.
//!
//! ```text
//!            Initialize ok                 FileSubmitted
//!   ─────────────────────────▶ Initial ─────────────────────▶ Loading
//!                               ▲  ▲                          │     │
//!                        Reset  │  │ Reset        ParseFailed │     │ ParseSucceeded
//!                               │  │                          ▼     ▼
//!   UnsupportedEnvironment ─────┘  └──────────────────── Error    Loaded ◀─┐
//!                                                          ▲        │      │ Scale/Format/Quality/
//!                                                          └────────┘      │ Background/Export*
//!                                                         ExportFailed     └──────┘
//! ```
//!
//! [`transition`] is a pure function; [`StateMachine`] owns the single current
//! value, notifies a [`StateObserver`](crate::progress::StateObserver), and
//! guards completion events from operations that outlived a reset.

use crate::capability::Capabilities;
use crate::config::{Background, ImageFormat, Rgb, MAX_SCALE_EXPONENT};
use crate::error::{Failure, FailureKind};
use crate::naming::{derive_filename, quality_percent};
use crate::progress::{NoopObserver, SharedObserver};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

// ── Source ───────────────────────────────────────────────────────────────

/// The uploaded SVG: its original file name and its text.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    name: String,
    #[serde(skip)]
    payload: Arc<str>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, payload: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Original file name, e.g. `"icon.svg"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SVG document text.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The payload as a `data:image/svg+xml;base64,…` URI, for previews.
    pub fn data_uri(&self) -> String {
        crate::pipeline::encode::svg_data_uri(&self.payload)
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("name", &self.name)
            .field("payload", &format_args!("<{} bytes>", self.payload.len()))
            .finish()
    }
}

// ── Loaded image ─────────────────────────────────────────────────────────

/// Everything the `Loaded` state holds.
///
/// Fields are read through accessors; the only way to change one is through
/// an [`Event`], which keeps `output_name` in step with its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedImage {
    source: SourceImage,
    width: u32,
    height: u32,
    size_text: String,
    scale: u8,
    format: ImageFormat,
    quality: f64,
    background: Background,
    output_name: String,
    processing: bool,
}

impl LoadedImage {
    fn new(source: SourceImage, width: u32, height: u32, size_text: String) -> Self {
        let mut image = Self {
            source,
            width,
            height,
            size_text,
            scale: 0,
            format: ImageFormat::Png,
            quality: crate::config::DEFAULT_QUALITY,
            background: Background::Transparent,
            output_name: String::new(),
            processing: false,
        };
        image.refresh_output_name();
        image
    }

    fn refresh_output_name(&mut self) {
        self.output_name =
            derive_filename(self.source.name(), self.scale, self.format, self.quality);
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Intrinsic width declared by the SVG.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Intrinsic height declared by the SVG.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Human-readable size of the uploaded file.
    pub fn size_text(&self) -> &str {
        &self.size_text
    }

    /// Scale exponent, 0–7.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Stored quality. Still tracked while PNG is selected.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// `true` between `ExportStarted` and `ExportFinished`.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// `2^scale`.
    pub fn scale_factor(&self) -> u32 {
        1 << self.scale
    }

    pub fn output_width(&self) -> u32 {
        self.width.saturating_mul(self.scale_factor())
    }

    pub fn output_height(&self) -> u32 {
        self.height.saturating_mul(self.scale_factor())
    }

    /// Whether the quality control has any effect for the current format.
    pub fn quality_adjustable(&self) -> bool {
        self.format.is_lossy()
    }

    /// Quality as shown to the user; PNG always reads `"100%"`.
    pub fn quality_label(&self) -> String {
        if self.format.is_lossy() {
            format!("{}%", quality_percent(self.quality))
        } else {
            "100%".to_string()
        }
    }

    /// The colour actually painted under the image, if any.
    ///
    /// JPEG cannot store transparency, so a transparent background becomes
    /// black for that format.
    pub fn effective_fill(&self) -> Option<Rgb> {
        match self.background {
            Background::Color(c) => Some(c),
            Background::Transparent if !self.format.has_alpha() => Some(Rgb::BLACK),
            Background::Transparent => None,
        }
    }

    /// Background as shown to the user, including the JPEG substitution.
    pub fn background_label(&self) -> String {
        match (self.background, self.effective_fill()) {
            (Background::Color(c), _) => c.to_string(),
            (Background::Transparent, Some(fill)) => fill.to_string(),
            (Background::Transparent, None) => "Transparent".to_string(),
        }
    }

    /// Whether offering "reset to transparent" makes sense.
    pub fn can_reset_to_transparent(&self) -> bool {
        matches!(self.background, Background::Color(_)) && self.format.has_alpha()
    }

    /// Bundle the fields the export adapter needs.
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            source: self.source.clone(),
            output_name: self.output_name.clone(),
            width: self.output_width(),
            height: self.output_height(),
            format: self.format,
            quality: self.quality,
            fill: self.effective_fill(),
        }
    }
}

/// Input of the export adapter, snapshotted from a `Loaded` state.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub source: SourceImage,
    pub output_name: String,
    /// Target pixel width (intrinsic × 2^scale).
    pub width: u32,
    /// Target pixel height (intrinsic × 2^scale).
    pub height: u32,
    pub format: ImageFormat,
    pub quality: f64,
    /// Opaque fill painted before the SVG, already resolved for JPEG.
    pub fill: Option<Rgb>,
}

// ── State ────────────────────────────────────────────────────────────────

/// The workflow state. Exactly one variant is active at a time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversionState {
    /// No file loaded.
    #[default]
    Initial,
    /// A file is being read and parsed.
    Loading,
    /// A file is loaded and the user is choosing export settings.
    Loaded(LoadedImage),
    /// Something failed; only `Reset` (or `Initialize`) leaves this state.
    Error(Failure),
    /// Required capabilities are missing.
    UnsupportedEnvironment,
}

impl ConversionState {
    /// Short name of the active variant, for logs and errors.
    pub fn tag(&self) -> &'static str {
        match self {
            ConversionState::Initial => "initial",
            ConversionState::Loading => "loading",
            ConversionState::Loaded(_) => "loaded",
            ConversionState::Error(_) => "error",
            ConversionState::UnsupportedEnvironment => "unsupported_environment",
        }
    }

    pub fn loaded(&self) -> Option<&LoadedImage> {
        match self {
            ConversionState::Loaded(image) => Some(image),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ConversionState::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────────

/// Everything that can happen to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Startup; carries the result of the capability probe.
    Initialize(Capabilities),
    /// The user picked or dropped a file.
    FileSubmitted,
    /// Reading or parsing the submitted file failed.
    ParseFailed(Failure),
    /// The submitted file was read and its dimensions extracted.
    ParseSucceeded {
        source: SourceImage,
        width: u32,
        height: u32,
        size_text: String,
    },
    /// New scale exponent; values above 7 are clamped.
    ScaleChanged(u8),
    FormatChanged(ImageFormat),
    /// New quality; clamped to [0, 1]. NaN is discarded.
    QualityChanged(f64),
    BackgroundChanged(Background),
    ExportStarted,
    ExportFinished,
    /// The export adapter failed with a specific diagnostic.
    ExportFailed(Failure),
    Reset,
    /// Catch-all failure with the generic message.
    UnspecifiedError,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialize(_) => "Initialize",
            Event::FileSubmitted => "FileSubmitted",
            Event::ParseFailed(_) => "ParseFailed",
            Event::ParseSucceeded { .. } => "ParseSucceeded",
            Event::ScaleChanged(_) => "ScaleChanged",
            Event::FormatChanged(_) => "FormatChanged",
            Event::QualityChanged(_) => "QualityChanged",
            Event::BackgroundChanged(_) => "BackgroundChanged",
            Event::ExportStarted => "ExportStarted",
            Event::ExportFinished => "ExportFinished",
            Event::ExportFailed(_) => "ExportFailed",
            Event::Reset => "Reset",
            Event::UnspecifiedError => "UnspecifiedError",
        }
    }

    /// Events that start a new generation; completions from before are stale.
    fn starts_generation(&self) -> bool {
        matches!(
            self,
            Event::Initialize(_) | Event::FileSubmitted | Event::Reset
        )
    }
}

// ── Transition function ──────────────────────────────────────────────────

/// Apply `event` to `state`.
///
/// Returns `Ok(next)` when the event is valid from `state`, or `Err(state)`
/// (unchanged) when it is not.
pub fn step(state: ConversionState, event: &Event) -> Result<ConversionState, ConversionState> {
    use ConversionState as S;

    match (event, state) {
        (Event::Initialize(caps), _) => Ok(if caps.is_supported() {
            S::Initial
        } else {
            S::UnsupportedEnvironment
        }),
        (Event::Reset, _) => Ok(S::Initial),
        (Event::UnspecifiedError, _) => Ok(S::Error(Failure::unspecified())),

        (Event::FileSubmitted, S::Initial) => Ok(S::Loading),
        (Event::ParseFailed(failure), S::Loading) => Ok(S::Error(failure.clone())),
        (
            Event::ParseSucceeded {
                source,
                width,
                height,
                size_text,
            },
            S::Loading,
        ) => {
            if *width == 0 || *height == 0 {
                return Ok(S::Error(Failure::new(
                    FailureKind::MalformedDimensions,
                    FailureKind::MalformedDimensions.default_message(),
                )));
            }
            Ok(S::Loaded(LoadedImage::new(
                source.clone(),
                *width,
                *height,
                size_text.clone(),
            )))
        }

        (Event::ScaleChanged(exponent), S::Loaded(mut image)) => {
            image.scale = (*exponent).min(MAX_SCALE_EXPONENT);
            image.refresh_output_name();
            Ok(S::Loaded(image))
        }
        (Event::FormatChanged(format), S::Loaded(mut image)) => {
            image.format = *format;
            image.refresh_output_name();
            Ok(S::Loaded(image))
        }
        (Event::QualityChanged(value), S::Loaded(image)) if value.is_nan() => {
            Err(S::Loaded(image))
        }
        (Event::QualityChanged(value), S::Loaded(mut image)) => {
            image.quality = (*value).clamp(0.0, 1.0);
            image.refresh_output_name();
            Ok(S::Loaded(image))
        }
        (Event::BackgroundChanged(background), S::Loaded(mut image)) => {
            image.background = *background;
            Ok(S::Loaded(image))
        }
        (Event::ExportStarted, S::Loaded(mut image)) => {
            image.processing = true;
            Ok(S::Loaded(image))
        }
        (Event::ExportFinished, S::Loaded(mut image)) => {
            image.processing = false;
            Ok(S::Loaded(image))
        }
        (Event::ExportFailed(failure), S::Loaded(_)) => Ok(S::Error(failure.clone())),

        (_, state) => Err(state),
    }
}

/// Pure transition: the next state, or `state` itself when `event` does not
/// apply.
pub fn transition(state: ConversionState, event: &Event) -> ConversionState {
    match step(state, event) {
        Ok(next) | Err(next) => next,
    }
}

// ── Holder ───────────────────────────────────────────────────────────────

/// Proof that an asynchronous operation started in a given generation.
///
/// Taken with [`StateMachine::ticket`] before suspending, redeemed with
/// [`StateMachine::complete`] when the operation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
}

/// Owns the current [`ConversionState`] and applies events to it.
pub struct StateMachine {
    state: ConversionState,
    epoch: u64,
    observer: SharedObserver,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl StateMachine {
    /// A machine in `Initial` with no observer.
    pub fn new() -> Self {
        Self::with_observer(Arc::new(NoopObserver))
    }

    pub fn with_observer(observer: SharedObserver) -> Self {
        Self {
            state: ConversionState::Initial,
            epoch: 0,
            observer,
        }
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    /// Apply a user-intent or startup event. Returns `true` if it applied.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let current = std::mem::take(&mut self.state);
        match step(current, &event) {
            Ok(next) => {
                if event.starts_generation() {
                    self.epoch = self.epoch.wrapping_add(1);
                }
                debug!(event = event.name(), state = next.tag(), "transition");
                self.state = next;
                self.observer.on_transition(&event, &self.state);
                true
            }
            Err(unchanged) => {
                debug!(
                    event = event.name(),
                    state = unchanged.tag(),
                    "event not applicable, ignored"
                );
                self.state = unchanged;
                self.observer.on_discarded(&event, &self.state, false);
                false
            }
        }
    }

    /// Mark the start of an asynchronous operation.
    pub fn ticket(&self) -> Ticket {
        Ticket { epoch: self.epoch }
    }

    /// Apply the completion `event` of the operation that took `ticket`.
    ///
    /// The event is discarded when a reset, upload or re-initialisation has
    /// happened since the ticket was taken, or when it does not apply to the
    /// current state. Returns `true` if it applied.
    pub fn complete(&mut self, ticket: Ticket, event: Event) -> bool {
        if ticket.epoch != self.epoch {
            warn!(
                event = event.name(),
                state = self.state.tag(),
                "discarding completion of a superseded operation"
            );
            self.observer.on_discarded(&event, &self.state, true);
            return false;
        }
        self.dispatch(event)
    }
}
