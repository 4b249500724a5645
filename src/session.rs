//! Async driver around the [`StateMachine`].
//!
//! A [`Session`] is the glue between the pure transition function and the
//! adapters that touch the outside world. Each user-facing operation
//! dispatches its intent event, runs the adapter, and feeds the adapter's
//! outcome back as a completion event through a [`Ticket`], so a completion
//! that outlives a reset can never overwrite newer state.
//!
//! Every applied event publishes a snapshot on a `tokio::sync::watch`
//! channel; render adapters follow it through [`Session::subscribe`].
//!
//! ```rust,no_run
//! use svgscale::{ConversionConfig, ImageFormat, Session};
//!
//! # async fn run() -> Result<(), svgscale::SvgScaleError> {
//! let mut session = Session::new(ConversionConfig::default());
//! session.load_path("logo.svg").await?;
//! session.set_scale(2);
//! session.set_format(ImageFormat::Webp);
//! let written = session.export_to("out/").await?;
//! println!("wrote {}", written.path.display());
//! # Ok(())
//! # }
//! ```

use crate::capability::Capabilities;
use crate::config::{Background, ConversionConfig, ImageFormat};
use crate::error::{Failure, FailureKind, SvgScaleError};
use crate::output::{ExportOutput, ExportedImage};
use crate::pipeline::input::{self, Upload};
use crate::pipeline::{parse, render};
use crate::progress::{NoopObserver, SharedObserver};
use crate::state::{
    ConversionState, Event, ExportRequest, LoadedImage, SourceImage, StateMachine, Ticket,
};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// Stream of state snapshots, starting with the current one.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = ConversionState> + Send>>;

/// One conversion workflow: at most one loaded SVG at a time.
pub struct Session {
    machine: StateMachine,
    capabilities: Capabilities,
    max_output_edge: u32,
    snapshots: watch::Sender<ConversionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("machine", &self.machine)
            .field("capabilities", &self.capabilities)
            .field("max_output_edge", &self.max_output_edge)
            .finish()
    }
}

impl Session {
    /// Probe the environment and start a session.
    ///
    /// The state is `Initial` when every capability is present, otherwise
    /// `UnsupportedEnvironment`. The config's observer (if any) is attached;
    /// its image settings apply once a file is loaded, via
    /// [`Session::apply_config`].
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_capabilities(config, Capabilities::detect())
    }

    /// Start a session with a known capability set, skipping the probe.
    pub fn with_capabilities(config: ConversionConfig, capabilities: Capabilities) -> Self {
        let observer: SharedObserver = config
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopObserver));
        let mut machine = StateMachine::with_observer(observer);
        machine.dispatch(Event::Initialize(capabilities));

        let (snapshots, _) = watch::channel(machine.state().clone());
        Self {
            machine,
            capabilities,
            max_output_edge: config.max_output_edge,
            snapshots,
        }
    }

    pub fn state(&self) -> &ConversionState {
        self.machine.state()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The loaded image, if the session is in `Loaded`.
    pub fn loaded(&self) -> Option<&LoadedImage> {
        self.machine.state().loaded()
    }

    /// Follow state changes. The stream yields the current state first.
    pub fn subscribe(&self) -> SnapshotStream {
        Box::pin(WatchStream::new(self.snapshots.subscribe()))
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Read and parse the SVG at `path`.
    ///
    /// On failure the session moves to `Error` and the error is returned as
    /// well. Only valid from `Initial`; call [`Session::reset`] first to
    /// replace a loaded file.
    pub async fn load_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&LoadedImage, SvgScaleError> {
        let path = path.as_ref();
        let ticket = self.begin_load()?;
        info!("Loading {}", path.display());

        let parsed = match input::read_path(path).await {
            Ok(upload) => parse_upload(&upload),
            Err(e) => Err(e),
        };
        self.finish_load(ticket, parsed)
    }

    /// Parse an in-memory upload named `name`.
    pub fn load_bytes(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<&LoadedImage, SvgScaleError> {
        let upload = Upload::new(name, bytes);
        let ticket = self.begin_load()?;
        info!("Loading {} ({} bytes)", upload.name, upload.size());

        let parsed = parse_upload(&upload);
        self.finish_load(ticket, parsed)
    }

    fn begin_load(&mut self) -> Result<Ticket, SvgScaleError> {
        if !self.dispatch(Event::FileSubmitted) {
            return Err(self.invalid_state("load a file"));
        }
        Ok(self.machine.ticket())
    }

    fn finish_load(
        &mut self,
        ticket: Ticket,
        parsed: Result<Event, SvgScaleError>,
    ) -> Result<&LoadedImage, SvgScaleError> {
        match parsed {
            Ok(event) => {
                self.complete(ticket, event);
                match self.machine.state() {
                    ConversionState::Loaded(image) => Ok(image),
                    other => Err(SvgScaleError::InvalidState {
                        operation: "finish loading",
                        state: other.tag(),
                    }),
                }
            }
            Err(e) => {
                warn!("Load failed: {}", e);
                self.complete(ticket, Event::ParseFailed(Failure::from(&e)));
                Err(e)
            }
        }
    }

    // ── User intents ─────────────────────────────────────────────────────

    /// Returns `true` if the change applied (only while `Loaded`).
    pub fn set_scale(&mut self, exponent: u8) -> bool {
        self.dispatch(Event::ScaleChanged(exponent))
    }

    pub fn set_format(&mut self, format: ImageFormat) -> bool {
        self.dispatch(Event::FormatChanged(format))
    }

    pub fn set_quality(&mut self, quality: f64) -> bool {
        self.dispatch(Event::QualityChanged(quality))
    }

    pub fn set_background(&mut self, background: Background) -> bool {
        self.dispatch(Event::BackgroundChanged(background))
    }

    /// Return to `Initial` from any state. In-flight completions become stale.
    pub fn reset(&mut self) {
        self.dispatch(Event::Reset);
    }

    /// Dispatch every image setting in `config`. Returns `true` if all applied.
    pub fn apply_config(&mut self, config: &ConversionConfig) -> bool {
        self.max_output_edge = config.max_output_edge;
        [
            Event::ScaleChanged(config.scale),
            Event::FormatChanged(config.format),
            Event::QualityChanged(config.quality),
            Event::BackgroundChanged(config.background),
        ]
        .into_iter()
        .fold(true, |all, event| self.dispatch(event) && all)
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Rasterise and encode the loaded image in memory.
    pub async fn export(&mut self) -> Result<ExportedImage, SvgScaleError> {
        let (ticket, request) = self.begin_export()?;
        let result = render::export_image(&request, self.max_output_edge).await;
        self.finish_export(ticket, result)
    }

    /// Export and write the image to `destination`.
    ///
    /// When `destination` is an existing directory (or ends with a path
    /// separator) the derived output name is used inside it. The file is
    /// written to a temporary sibling and renamed into place.
    pub async fn export_to(
        &mut self,
        destination: impl AsRef<Path>,
    ) -> Result<ExportOutput, SvgScaleError> {
        let start = Instant::now();
        let destination = destination.as_ref();
        let (ticket, request) = self.begin_export()?;
        let max_edge = self.max_output_edge;

        let result = async {
            let image = render::export_image(&request, max_edge).await?;
            let path = resolve_destination(destination, &image.file_name).await;
            write_atomic(&path, &image.bytes).await?;
            info!("Wrote {} ({} bytes)", path.display(), image.byte_len);

            Ok::<_, SvgScaleError>(ExportOutput {
                path,
                file_name: image.file_name,
                format: image.format,
                width: image.width,
                height: image.height,
                bytes_written: image.byte_len as u64,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        .await;

        self.finish_export(ticket, result)
    }

    fn begin_export(&mut self) -> Result<(Ticket, ExportRequest), SvgScaleError> {
        let request = self
            .loaded()
            .map(LoadedImage::export_request)
            .ok_or_else(|| self.invalid_state("export"))?;
        self.dispatch(Event::ExportStarted);
        Ok((self.machine.ticket(), request))
    }

    fn finish_export<T>(
        &mut self,
        ticket: Ticket,
        result: Result<T, SvgScaleError>,
    ) -> Result<T, SvgScaleError> {
        match result {
            Ok(value) => {
                self.complete(ticket, Event::ExportFinished);
                Ok(value)
            }
            Err(e) => {
                warn!("Export failed: {}", e);
                let event = match e.kind() {
                    FailureKind::UnspecifiedFailure => Event::UnspecifiedError,
                    _ => Event::ExportFailed(Failure::from(&e)),
                };
                self.complete(ticket, event);
                Err(e)
            }
        }
    }

    // ── Plumbing ─────────────────────────────────────────────────────────

    fn dispatch(&mut self, event: Event) -> bool {
        let applied = self.machine.dispatch(event);
        if applied {
            self.publish();
        }
        applied
    }

    fn complete(&mut self, ticket: Ticket, event: Event) -> bool {
        let applied = self.machine.complete(ticket, event);
        if applied {
            self.publish();
        }
        applied
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.machine.state().clone());
    }

    fn invalid_state(&self, operation: &'static str) -> SvgScaleError {
        SvgScaleError::InvalidState {
            operation,
            state: self.machine.state().tag(),
        }
    }
}

/// Decode and measure an upload, producing the `ParseSucceeded` event.
fn parse_upload(upload: &Upload) -> Result<Event, SvgScaleError> {
    let text = upload.text()?;
    let dims = parse::parse_dimensions(&upload.name, text)?;
    Ok(Event::ParseSucceeded {
        source: SourceImage::new(upload.name.clone(), text),
        width: dims.width,
        height: dims.height,
        size_text: upload.size_text(),
    })
}

async fn resolve_destination(destination: &Path, file_name: &str) -> PathBuf {
    let names_directory = destination
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::MAIN_SEPARATOR)
        || tokio::fs::metadata(destination)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

    if names_directory {
        destination.join(file_name)
    } else {
        destination.to_path_buf()
    }
}

/// Write to `<path>.tmp`, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SvgScaleError> {
    let write_failed = |source| SvgScaleError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}
