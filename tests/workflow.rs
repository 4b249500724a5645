//! Integration tests for the svgscale workflow.
//!
//! Everything here runs offline against small SVG documents written to
//! scratch directories, so the whole suite runs in CI.
//!
//! Run with:
//!   cargo test --test workflow -- --nocapture

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use svgscale::{
    convert, convert_from_bytes, convert_sync, convert_to_file, inspect, transition,
    Background, Capabilities, ConversionConfig, ConversionState, Event, FailureKind, ImageFormat,
    Rgb, Session, StateMachine, StateObserver, SvgScaleError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// 100×50, left half opaque red, right half empty.
const HALF_RED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50"><rect x="0" y="0" width="50" height="50" fill="#ff0000"/></svg>"##;

fn write_svg(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write scratch svg");
    path
}

fn session() -> Session {
    Session::with_capabilities(ConversionConfig::default(), Capabilities::all())
}

fn every_state() -> Vec<ConversionState> {
    let mut loaded = session();
    loaded.load_bytes("a.svg", HALF_RED).unwrap();
    let mut failed = session();
    let _ = failed.load_bytes("a.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>");

    vec![
        ConversionState::Initial,
        ConversionState::Loading,
        loaded.state().clone(),
        failed.state().clone(),
        ConversionState::UnsupportedEnvironment,
    ]
}

// ── Loading ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_view_box_only_loads_intrinsic_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_svg(dir.path(), "half.svg", HALF_RED);

    let mut s = session();
    let image = s.load_path(&path).await.unwrap();
    assert_eq!((image.width(), image.height()), (100, 50));
    assert_eq!(image.scale(), 0);
    assert_eq!(image.format(), ImageFormat::Png);
    assert_eq!(image.background(), Background::Transparent);
    assert_eq!(image.output_name(), "half (1x).png");
    assert!(image
        .source()
        .data_uri()
        .starts_with("data:image/svg+xml;base64,"));
}

#[tokio::test]
async fn test_zero_view_box_width_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_svg(
        dir.path(),
        "zero.svg",
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 0 50"/>"#,
    );

    let mut s = session();
    let err = s.load_path(&path).await.unwrap_err();
    assert!(matches!(err, SvgScaleError::MalformedDimensions { .. }));

    let failure = s.state().failure().expect("state should be Error");
    assert_eq!(failure.kind, FailureKind::MalformedDimensions);
    assert!(!failure.message.is_empty());
}

#[tokio::test]
async fn test_missing_file_lands_in_error() {
    let mut s = session();
    let err = s.load_path("/no/such/dir/icon.svg").await.unwrap_err();
    assert!(matches!(err, SvgScaleError::FileNotFound { .. }));
    assert_eq!(s.state().failure().unwrap().kind, FailureKind::ReadFailure);
}

#[tokio::test]
async fn test_inspect_reports_dimensions_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_svg(dir.path(), "half.svg", HALF_RED);

    let info = inspect(&path).await.unwrap();
    assert_eq!(info.name, "half.svg");
    assert_eq!((info.width, info.height), (100, 50));
    assert_eq!(info.size_bytes, HALF_RED.len() as u64);
    assert_eq!(info.size_text, format!("{} bytes", HALF_RED.len()));
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    let err = inspect("/definitely/not/here.svg").await.unwrap_err();
    assert!(matches!(err, SvgScaleError::FileNotFound { .. }));
}

// ── State machine properties ─────────────────────────────────────────────────

#[test]
fn test_reset_from_every_state_returns_to_initial() {
    for state in every_state() {
        let tag = state.tag();
        assert_eq!(
            transition(state, &Event::Reset),
            ConversionState::Initial,
            "Reset from {tag}"
        );
    }
}

#[test]
fn test_scale_changed_twice_is_idempotent() {
    let mut s = session();
    s.load_bytes("half.svg", HALF_RED).unwrap();

    s.set_scale(3);
    let once = s.state().clone();
    s.set_scale(3);
    assert_eq!(s.state(), &once);
    assert_eq!(s.loaded().unwrap().output_name(), "half (8x).png");
}

#[test]
fn test_png_quality_is_stored_but_label_stays_full() {
    let mut s = session();
    s.load_bytes("half.svg", HALF_RED).unwrap();
    assert!(s.set_quality(0.3));

    let image = s.loaded().unwrap();
    assert_eq!(image.quality(), 0.3);
    assert_eq!(image.quality_label(), "100%");
    assert_eq!(image.output_name(), "half (1x).png");
}

#[test]
fn test_jpeg_on_transparent_reports_black() {
    let mut s = session();
    s.load_bytes("half.svg", HALF_RED).unwrap();
    s.set_format(ImageFormat::Jpeg);

    let image = s.loaded().unwrap();
    assert_eq!(image.effective_fill(), Some(Rgb::BLACK));
    assert_eq!(image.background_label(), "#000000");
}

#[test]
fn test_stale_completion_is_discarded() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, bool)>>);

    impl StateObserver for Recorder {
        fn on_discarded(&self, event: &Event, _state: &ConversionState, stale: bool) {
            self.0.lock().unwrap().push((event.name().to_string(), stale));
        }
    }

    let recorder = Arc::new(Recorder::default());
    let mut machine = StateMachine::with_observer(recorder.clone());
    assert!(machine.dispatch(Event::FileSubmitted));
    let ticket = machine.ticket();

    machine.dispatch(Event::Reset);
    let applied = machine.complete(ticket, Event::ParseFailed(svgscale::Failure::unspecified()));

    assert!(!applied);
    assert_eq!(machine.state(), &ConversionState::Initial);
    assert_eq!(
        recorder.0.lock().unwrap().as_slice(),
        &[("ParseFailed".to_string(), true)]
    );
}

// ── Export ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exported_images_decode_to_scaled_size() {
    for format in ImageFormat::ALL {
        let config = ConversionConfig::builder()
            .scale(2)
            .format(format)
            .build()
            .unwrap();
        let output = convert_from_bytes("half.svg", HALF_RED, &config).await.unwrap();

        assert_eq!(output.image.mime_type, format.mime_type());
        let decoded = image::load_from_memory(&output.image.bytes)
            .unwrap_or_else(|e| panic!("{format} output does not decode: {e}"));
        assert_eq!((decoded.width(), decoded.height()), (400, 200), "{format}");
    }
}

#[tokio::test]
async fn test_jpeg_export_fills_transparency_with_black() {
    let config = ConversionConfig::builder()
        .format(ImageFormat::Jpeg)
        .quality(1.0)
        .build()
        .unwrap();
    let output = convert_from_bytes("half.svg", HALF_RED, &config).await.unwrap();
    let rgb = image::load_from_memory(&output.image.bytes).unwrap().to_rgb8();

    let [r, g, b] = rgb.get_pixel(90, 25).0;
    assert!(r < 16 && g < 16 && b < 16, "expected black, got {r},{g},{b}");
    let [r, _, _] = rgb.get_pixel(10, 25).0;
    assert!(r > 230, "left half should stay red");
}

#[tokio::test]
async fn test_background_colour_is_painted() {
    let config = ConversionConfig::builder()
        .background("#00ff00".parse().unwrap())
        .build()
        .unwrap();
    let output = convert_from_bytes("half.svg", HALF_RED, &config).await.unwrap();
    let rgba = image::load_from_memory(&output.image.bytes).unwrap().to_rgba8();
    assert_eq!(rgba.get_pixel(90, 25).0, [0, 255, 0, 255]);
}

#[tokio::test]
async fn test_convert_to_directory_uses_derived_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_svg(dir.path(), "logo.svg", HALF_RED);
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let config = ConversionConfig::builder()
        .scale(1)
        .format(ImageFormat::Webp)
        .quality(0.75)
        .build()
        .unwrap();
    let written = convert_to_file(&input, &out_dir, &config).await.unwrap();

    assert_eq!(written.path, out_dir.join("logo (2x@q75).webp"));
    assert_eq!((written.width, written.height), (200, 100));
    let decoded = image::open(&written.path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 100));
}

#[test]
fn test_convert_to_file_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_svg(dir.path(), "logo.svg", HALF_RED);
    let target = dir.path().join("renamed.png");

    let written = tokio_test::block_on(convert_to_file(
        &input,
        &target,
        &ConversionConfig::default(),
    ))
    .unwrap();
    assert_eq!(written.path, target);
    assert_eq!(written.file_name, "logo (1x).png");
    assert!(target.exists());
}

#[test]
fn test_convert_sync_matches_async_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_svg(dir.path(), "logo.svg", HALF_RED);

    let output = convert_sync(&input, &ConversionConfig::default()).unwrap();
    assert_eq!(output.info.width, 100);
    assert_eq!(output.image.file_name, "logo (1x).png");
    assert_eq!(output.image.byte_len, output.image.bytes.len());
}

#[tokio::test]
async fn test_convert_output_is_json_serialisable() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_svg(dir.path(), "logo.svg", HALF_RED);

    let output = convert(&input, &ConversionConfig::default()).await.unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["info"]["width"], 100);
    assert_eq!(json["image"]["format"], "png");
    assert!(json["image"].get("bytes").is_none());
}

#[tokio::test]
async fn test_export_failure_then_reset_recovers() {
    let config = ConversionConfig::builder().max_output_edge(64).build().unwrap();
    let mut s = Session::with_capabilities(config, Capabilities::all());
    s.load_bytes("half.svg", HALF_RED).unwrap();

    assert!(s.export().await.is_err());
    assert_eq!(s.state().tag(), "error");

    s.reset();
    assert_eq!(s.state(), &ConversionState::Initial);
    s.load_bytes("again.svg", HALF_RED).unwrap();
    assert_eq!(s.state().tag(), "loaded");
}

#[tokio::test]
async fn test_huge_canvas_fails_without_rendering() {
    // 256² at 128× is 32768², inside the edge cap but a 4 GiB canvas.
    let square = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 256 256"/>"#;
    let mut s = session();
    s.load_bytes("square.svg", square).unwrap();
    s.set_scale(7);

    let err = s.export().await.unwrap_err();
    assert!(matches!(err, SvgScaleError::ExportFailure { .. }));
    assert_eq!(s.state().failure().unwrap().kind, FailureKind::ExportFailure);
}

#[tokio::test]
async fn test_webp_edge_limit_fails_before_rendering() {
    // 25600×1280 fits the default cap but not libwebp's 16383 px.
    let strip = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 10"/>"#;
    let mut s = session();
    s.load_bytes("strip.svg", strip).unwrap();
    s.set_scale(7);
    s.set_format(ImageFormat::Webp);

    let err = s.export().await.unwrap_err();
    match err {
        SvgScaleError::ExportFailure { detail, .. } => assert!(detail.contains("16383")),
        other => panic!("expected ExportFailure, got {other:?}"),
    }
    assert_eq!(s.state().tag(), "error");
}

#[test]
fn test_observer_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<svgscale::NoopObserver>();
    assert_send_sync::<Session>();
}
