//! Configuration types for SVG rasterisation.
//!
//! The user-facing choices (scale, format, quality, background) live in
//! [`ConversionConfig`], built via its [`ConversionConfigBuilder`]. The same
//! value types ([`ImageFormat`], [`Background`], [`Rgb`]) are carried by the
//! state machine, so a config can be replayed into a session as plain events.

use crate::error::SvgScaleError;
use crate::progress::SharedObserver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest scale exponent; the effective factor is `2^exponent`, so 1×–128×.
pub const MAX_SCALE_EXPONENT: u8 = 7;

/// Quality a freshly loaded image starts with.
pub const DEFAULT_QUALITY: f64 = 0.9;

/// Default cap on either edge of the rendered bitmap, in pixels.
pub const DEFAULT_MAX_OUTPUT_EDGE: u32 = 32_768;

/// Configuration for a single SVG conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`], whose values match what a freshly loaded
/// image starts with.
///
/// # Example
/// ```rust
/// use svgscale::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .scale(2)
///     .format(ImageFormat::Jpeg)
///     .quality(0.8)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 2);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Scale exponent, 0–7. The output is `intrinsic × 2^scale` pixels. Default: 0.
    pub scale: u8,

    /// Target raster format. Default: PNG.
    pub format: ImageFormat,

    /// Lossy quality in [0, 1]. Ignored for PNG. Default: 0.9.
    pub quality: f64,

    /// Background fill drawn under the image. Default: transparent.
    ///
    /// JPEG has no alpha channel; a transparent background is exported on black.
    pub background: Background,

    /// Refuse to rasterise when either output edge exceeds this. Default: 32 768.
    ///
    /// A 2 000 px wide icon at 128× would need a 256 000 px wide canvas;
    /// the cap turns that into an export error instead of an allocation failure.
    pub max_output_edge: u32,

    /// Receives every state transition of the session driving the conversion.
    pub observer: Option<SharedObserver>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: 0,
            format: ImageFormat::Png,
            quality: DEFAULT_QUALITY,
            background: Background::Transparent,
            max_output_edge: DEFAULT_MAX_OUTPUT_EDGE,
            observer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("format", &self.format)
            .field("quality", &self.quality)
            .field("background", &self.background)
            .field("max_output_edge", &self.max_output_edge)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn StateObserver>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, exponent: u8) -> Self {
        self.config.scale = exponent.min(MAX_SCALE_EXPONENT);
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.config.format = format;
        self
    }

    /// NaN is kept as-is so that `build()` can reject it.
    pub fn quality(mut self, quality: f64) -> Self {
        self.config.quality = if quality.is_nan() {
            quality
        } else {
            quality.clamp(0.0, 1.0)
        };
        self
    }

    pub fn background(mut self, background: Background) -> Self {
        self.config.background = background;
        self
    }

    pub fn max_output_edge(mut self, px: u32) -> Self {
        self.config.max_output_edge = px;
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, SvgScaleError> {
        let c = &self.config;
        if c.scale > MAX_SCALE_EXPONENT {
            return Err(SvgScaleError::InvalidConfig(format!(
                "Scale exponent must be 0–{MAX_SCALE_EXPONENT}, got {}",
                c.scale
            )));
        }
        if !c.quality.is_finite() {
            return Err(SvgScaleError::InvalidConfig(format!(
                "Quality must be a number in 0–1, got {}",
                c.quality
            )));
        }
        if c.max_output_edge == 0 {
            return Err(SvgScaleError::InvalidConfig(
                "Maximum output edge must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// Raster formats an SVG can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless, keeps alpha. (default)
    #[default]
    Png,
    /// Lossy, no alpha channel.
    Jpeg,
    /// Lossy, keeps alpha.
    Webp,
}

impl ImageFormat {
    /// Every supported format, in the order a picker lists them.
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp];

    /// Display name, e.g. `"PNG"`.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Webp => "WEBP",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }

    /// Whether the quality setting affects the encoded output.
    pub fn is_lossy(self) -> bool {
        !matches!(self, ImageFormat::Png)
    }

    /// Whether the format can store transparency.
    pub fn has_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = SvgScaleError;

    /// Accepts names, extensions and MIME types, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" | "image/png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" | "image/jpeg" => Ok(ImageFormat::Jpeg),
            "webp" | "image/webp" => Ok(ImageFormat::Webp),
            other => Err(SvgScaleError::InvalidConfig(format!(
                "Unknown image format '{other}' (expected png, jpeg or webp)"
            ))),
        }
    }
}

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

static RE_HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?(?:([0-9a-fA-F]{6})|([0-9a-fA-F]{3}))$").unwrap());

impl FromStr for Rgb {
    type Err = SvgScaleError;

    /// Parses `#rrggbb` or `#rgb`; the `#` is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            SvgScaleError::InvalidConfig(format!(
                "Invalid colour '{s}' (expected #rrggbb or #rgb)"
            ))
        };
        let caps = RE_HEX_COLOR.captures(s.trim()).ok_or_else(invalid)?;

        let digits: Vec<u8> = if let Some(long) = caps.get(1) {
            long.as_str()
                .as_bytes()
                .chunks(2)
                .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap_or("0"), 16))
                .collect::<Result<_, _>>()
                .map_err(|_| invalid())?
        } else {
            let short = caps.get(2).ok_or_else(invalid)?;
            short
                .as_str()
                .chars()
                .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
                .collect::<Option<_>>()
                .ok_or_else(invalid)?
        };

        match digits.as_slice() {
            [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
            _ => Err(invalid()),
        }
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for Rgb {
    type Error = SvgScaleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Background drawn under the SVG before it is rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Background {
    /// No fill; transparent pixels stay transparent where the format allows. (default)
    #[default]
    Transparent,
    /// Solid colour fill.
    Color(Rgb),
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Transparent => f.write_str("transparent"),
            Background::Color(c) => fmt::Display::fmt(c, f),
        }
    }
}

impl FromStr for Background {
    type Err = SvgScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("transparent") {
            Ok(Background::Transparent)
        } else {
            s.parse().map(Background::Color)
        }
    }
}

impl From<Background> for String {
    fn from(b: Background) -> Self {
        b.to_string()
    }
}

impl TryFrom<String> for Background {
    type Error = SvgScaleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
