//! Derived display strings: output filename and human-readable file size.
//!
//! Both are pure functions of their inputs. The state machine recomputes the
//! output name on every change to scale, format or quality rather than storing
//! it as an independent field that could drift.

use crate::config::ImageFormat;

/// Build the export filename for `name` at the given settings.
///
/// The last `.`-separated segment of `name` is dropped and replaced by the
/// target format's extension, so a name without any `.` leaves an empty
/// stem. The remaining stem gets a ` (<factor>x)` tag,
/// extended with `@q<percent>` for lossy formats:
///
/// ```rust
/// use svgscale::{derive_filename, ImageFormat};
///
/// assert_eq!(derive_filename("icon.svg", 2, ImageFormat::Jpeg, 0.8), "icon (4x@q80).jpg");
/// assert_eq!(derive_filename("logo.svg", 0, ImageFormat::Png, 0.9), "logo (1x).png");
/// ```
pub fn derive_filename(name: &str, exponent: u8, format: ImageFormat, quality: f64) -> String {
    let mut segments: Vec<&str> = name.split('.').collect();
    segments.pop();
    let stem = segments.join(".");

    let factor = 1u32 << u32::from(exponent.min(31));
    let suffix = if format.is_lossy() {
        format!("@q{}", quality_percent(quality))
    } else {
        String::new()
    };

    format!("{stem} ({factor}x{suffix}).{}", format.extension())
}

/// `quality × 100`, truncated towards zero.
///
/// Truncation happens on the IEEE product, so `0.29` yields `28`, matching
/// what the quality slider has always shown.
pub fn quality_percent(quality: f64) -> i64 {
    (quality * 100.0).trunc() as i64
}

/// Describe a byte count the way the upload preview shows it.
///
/// Decimal units: under 1 000 bytes is shown in bytes, under 1 000 000 in
/// kilobytes, everything else in megabytes. The quotient is printed with the
/// shortest decimal that round-trips, so `1500` is `"1.5 kilobytes"`.
pub fn file_size_text(size: u64) -> String {
    if size < 1_000 {
        format!("{size} bytes")
    } else if size < 1_000_000 {
        format!("{} kilobytes", size as f64 / 1_000.0)
    } else {
        format!("{} megabytes", size as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_has_no_quality_tag() {
        assert_eq!(
            derive_filename("logo.svg", 0, ImageFormat::Png, 0.9),
            "logo (1x).png"
        );
        assert_eq!(
            derive_filename("logo.svg", 7, ImageFormat::Png, 0.1),
            "logo (128x).png"
        );
    }

    #[test]
    fn lossy_formats_carry_quality() {
        assert_eq!(
            derive_filename("icon.svg", 2, ImageFormat::Jpeg, 0.8),
            "icon (4x@q80).jpg"
        );
        assert_eq!(
            derive_filename("icon.svg", 1, ImageFormat::Webp, 1.0),
            "icon (2x@q100).webp"
        );
        assert_eq!(
            derive_filename("icon.svg", 0, ImageFormat::Webp, 0.0),
            "icon (1x@q0).webp"
        );
    }

    #[test]
    fn quality_is_truncated_not_rounded() {
        assert_eq!(quality_percent(0.29), 28);
        assert_eq!(quality_percent(0.999), 99);
        assert_eq!(
            derive_filename("a.svg", 0, ImageFormat::Jpeg, 0.29),
            "a (1x@q28).jpg"
        );
    }

    #[test]
    fn only_last_segment_is_replaced() {
        assert_eq!(
            derive_filename("my.brand.logo.svg", 3, ImageFormat::Png, 0.9),
            "my.brand.logo (8x).png"
        );
    }

    #[test]
    fn name_without_dot_has_empty_stem() {
        assert_eq!(
            derive_filename("drawing", 1, ImageFormat::Png, 0.9),
            " (2x).png"
        );
        assert_eq!(
            derive_filename("drawing", 0, ImageFormat::Jpeg, 0.5),
            " (1x@q50).jpg"
        );
        assert_eq!(
            derive_filename(".svg", 0, ImageFormat::Png, 0.9),
            " (1x).png"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        for exponent in 0..=7 {
            for format in ImageFormat::ALL {
                let a = derive_filename("x.svg", exponent, format, 0.5);
                let b = derive_filename("x.svg", exponent, format, 0.5);
                assert_eq!(a, b);
                assert!(a.ends_with(format.extension()));
                assert!(a.contains(&format!("({}x", 1u32 << exponent)));
            }
        }
    }

    #[test]
    fn size_text_units() {
        assert_eq!(file_size_text(0), "0 bytes");
        assert_eq!(file_size_text(999), "999 bytes");
        assert_eq!(file_size_text(1_000), "1 kilobytes");
        assert_eq!(file_size_text(1_500), "1.5 kilobytes");
        assert_eq!(file_size_text(1_234), "1.234 kilobytes");
        assert_eq!(file_size_text(2_500_000), "2.5 megabytes");
    }
}
