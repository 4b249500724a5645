//! Probe for the facilities a conversion needs.
//!
//! The result travels inside [`crate::state::Event::Initialize`]; a session
//! that lacks any of them lands in `UnsupportedEnvironment` instead of
//! `Initial`. Each probe exercises the real code path on a 1×1 image, so a
//! build with a broken or missing codec is caught before the user uploads.

use crate::config::{ImageFormat, Rgb};
use crate::pipeline::{encode, parse, render};
use serde::Serialize;
use tracing::{debug, warn};

const PROBE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"><rect width="1" height="1"/></svg>"#;

/// Which required facilities are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// SVG documents can be parsed and their dimensions read.
    pub svg_parser: bool,
    /// SVG trees can be rasterised into a pixel buffer.
    pub rasterizer: bool,
    pub png_encoder: bool,
    pub jpeg_encoder: bool,
    pub webp_encoder: bool,
}

impl Capabilities {
    /// Every capability present.
    pub fn all() -> Self {
        Self {
            svg_parser: true,
            rasterizer: true,
            png_encoder: true,
            jpeg_encoder: true,
            webp_encoder: true,
        }
    }

    /// Run each probe once.
    pub fn detect() -> Self {
        let svg_parser = parse::parse_dimensions("probe.svg", PROBE_SVG).is_ok();

        let raster = render::rasterize("probe.svg", PROBE_SVG, 1, 1, Some(Rgb::WHITE), 1);
        let rasterizer = raster.is_ok();

        let probe_encoder = |format: ImageFormat| match &raster {
            Ok(image) => encode::encode_image("probe.svg", image, format, 0.9).is_ok(),
            Err(_) => false,
        };

        let caps = Self {
            svg_parser,
            rasterizer,
            png_encoder: probe_encoder(ImageFormat::Png),
            jpeg_encoder: probe_encoder(ImageFormat::Jpeg),
            webp_encoder: probe_encoder(ImageFormat::Webp),
        };

        if caps.is_supported() {
            debug!("Capability probe passed");
        } else {
            warn!("Capability probe failed, missing: {}", caps.missing().join(", "));
        }
        caps
    }

    pub fn supports(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Png => self.png_encoder,
            ImageFormat::Jpeg => self.jpeg_encoder,
            ImageFormat::Webp => self.webp_encoder,
        }
    }

    /// `true` when a conversion can run end to end for every format.
    pub fn is_supported(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the missing capabilities.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.svg_parser {
            missing.push("SVG parser");
        }
        if !self.rasterizer {
            missing.push("rasterizer");
        }
        for format in ImageFormat::ALL {
            if !self.supports(format) {
                missing.push(match format {
                    ImageFormat::Png => "PNG encoder",
                    ImageFormat::Jpeg => "JPEG encoder",
                    ImageFormat::Webp => "WEBP encoder",
                });
            }
        }
        missing
    }
}
