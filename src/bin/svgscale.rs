//! CLI binary for svgscale.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use svgscale::{
    convert_to_file, Background, ConversionConfig, ConversionState, Event, ImageFormat,
    PreviewSummary, Session, SharedObserver, StateObserver,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner whose message follows the workflow state.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StateObserver for CliObserver {
    fn on_transition(&self, event: &Event, state: &ConversionState) {
        match (event, state) {
            (Event::ExportFinished, _)
            | (_, ConversionState::Error(_))
            | (_, ConversionState::UnsupportedEnvironment) => {
                self.bar.finish_and_clear();
            }
            (_, ConversionState::Loading) => {
                self.bar.set_prefix("Loading");
                self.bar.set_message("reading SVG…");
            }
            (Event::ExportStarted, ConversionState::Loaded(image)) => {
                self.bar.set_prefix("Rendering");
                self.bar.set_message(format!(
                    "{}x{} {}",
                    image.output_width(),
                    image.output_height(),
                    image.format()
                ));
            }
            (_, ConversionState::Loaded(image)) if !image.is_processing() => {
                self.bar.set_prefix("Loaded");
                self.bar
                    .set_message(format!("{} ({})", image.source().name(), image.size_text()));
            }
            _ => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # 1x PNG next to the current directory: ./logo (1x).png
  svgscale logo.svg

  # 8x JPEG at 80% quality into out/
  svgscale logo.svg --scale 3 --format jpeg --quality 0.8 -o out/

  # White background, explicit output file
  svgscale icon.svg --background '#ffffff' -o icon.png

  # Show dimensions and the derived output name without rendering
  svgscale --inspect-only --scale 2 --format webp icon.svg

SCALES:
  0 → 1x   1 → 2x   2 → 4x   3 → 8x   4 → 16x   5 → 32x   6 → 64x   7 → 128x

ENVIRONMENT VARIABLES:
  Every flag can be set with SVGSCALE_<FLAG>, e.g. SVGSCALE_FORMAT=webp.
  RUST_LOG overrides the log filter.
"#;

/// Convert SVG images to PNG, JPEG or WebP at power-of-two scales.
#[derive(Parser, Debug)]
#[command(
    name = "svgscale",
    version,
    about = "Convert SVG images to PNG, JPEG or WebP at power-of-two scales",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// SVG file to convert.
    input: PathBuf,

    /// Output directory or file. Default: the current directory.
    #[arg(short, long, env = "SVGSCALE_OUTPUT")]
    output: Option<PathBuf>,

    /// Scale exponent: the output is 2^SCALE times the intrinsic size.
    #[arg(long, env = "SVGSCALE_SCALE", default_value_t = 0,
          value_parser = clap::value_parser!(u8).range(0..=7))]
    scale: u8,

    /// Output format.
    #[arg(long, env = "SVGSCALE_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// Lossy quality in 0–1 (JPEG and WebP only).
    #[arg(long, env = "SVGSCALE_QUALITY", default_value_t = 0.9, value_parser = parse_quality)]
    quality: f64,

    /// Background: `transparent` or a hex colour such as `#ffffff`.
    #[arg(long, env = "SVGSCALE_BACKGROUND", default_value = "transparent")]
    background: Background,

    /// Output structured JSON instead of a summary line.
    #[arg(long, env = "SVGSCALE_JSON")]
    json: bool,

    /// Print dimensions and derived settings only, no rendering.
    #[arg(long, env = "SVGSCALE_INSPECT_ONLY")]
    inspect_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "SVGSCALE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SVGSCALE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SVGSCALE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Webp => ImageFormat::Webp,
        }
    }
}

fn parse_quality(s: &str) -> Result<f64, String> {
    let q: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&q) {
        Ok(q)
    } else {
        Err(format!("{q} is not in 0–1"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already says what is happening; keep INFO logs out of it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let observer: Option<SharedObserver> = if show_progress {
        Some(CliObserver::new() as SharedObserver)
    } else {
        None
    };
    let config = build_config(&cli, observer)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut session = Session::new(config.clone());
        session
            .load_path(&cli.input)
            .await
            .with_context(|| format!("Failed to load {}", cli.input.display()))?;
        session.apply_config(&config);
        let preview = session
            .loaded()
            .map(PreviewSummary::from)
            .context("No image loaded")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&preview).context("Failed to serialise preview")?
            );
        } else {
            println!("File:         {} ({})", preview.name, preview.size_text);
            println!("Size:         {}x{}", preview.width, preview.height);
            println!(
                "Output:       {}x{} ({}x)",
                preview.output_width, preview.output_height, preview.scale_factor
            );
            println!("Format:       {}", preview.format);
            println!("Quality:      {}", preview.quality_label);
            println!("Background:   {}", preview.background_label);
            println!("File name:    {}", preview.output_name);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let destination = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let written = convert_to_file(&cli.input, &destination, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&written).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}x{} {}  {}  {}ms  →  {}",
            green("✔"),
            written.width,
            written.height,
            written.format,
            dim(&format!("{} bytes", written.bytes_written)),
            written.duration_ms,
            bold(&written.path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, observer: Option<SharedObserver>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .format(cli.format.into())
        .quality(cli.quality)
        .background(cli.background);

    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}
