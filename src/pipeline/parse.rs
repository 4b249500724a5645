//! Intrinsic-size extraction from the root `<svg>` element.
//!
//! Precedence:
//!
//! 1. `width` **and** `height` present → both parsed as integers.
//! 2. otherwise `viewBox` present → exactly four whitespace-separated tokens,
//!    the third and fourth being the width and height.
//! 3. otherwise → [`SvgScaleError::MissingDimensions`].
//!
//! Integers are read the way a lenient HTML attribute parser reads them: skip
//! leading whitespace, accept an optional sign, take the leading run of
//! digits and ignore the rest. `"100px"` is 100 and `"12.5"` is 12. A value
//! with no leading digits, or one that is not positive, is malformed.

use crate::error::SvgScaleError;
use roxmltree::{Document, ParsingOptions};
use serde::Serialize;
use tracing::debug;

/// Intrinsic pixel size declared by an SVG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Read the intrinsic dimensions of the SVG document `text`.
///
/// `name` only labels errors.
pub fn parse_dimensions(name: &str, text: &str) -> Result<Dimensions, SvgScaleError> {
    // Plenty of SVGs in the wild carry a DOCTYPE from old editors.
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options).map_err(|e| {
        SvgScaleError::InvalidSvg {
            name: name.to_string(),
            detail: e.to_string(),
        }
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(SvgScaleError::InvalidSvg {
            name: name.to_string(),
            detail: format!("root element is <{}>, expected <svg>", root.tag_name().name()),
        });
    }

    let dims = match (
        root.attribute("width"),
        root.attribute("height"),
        root.attribute("viewBox"),
    ) {
        (Some(width), Some(height), _) => Dimensions {
            width: positive_dimension("width", width, width)?,
            height: positive_dimension("height", height, height)?,
        },
        (_, _, Some(view_box)) => dimensions_from_view_box(view_box)?,
        _ => return Err(SvgScaleError::MissingDimensions),
    };

    debug!("{} declares {}x{}", name, dims.width, dims.height);
    Ok(dims)
}

fn dimensions_from_view_box(view_box: &str) -> Result<Dimensions, SvgScaleError> {
    let tokens: Vec<&str> = view_box.split_whitespace().collect();
    let [_, _, width, height] = tokens.as_slice() else {
        return Err(SvgScaleError::MalformedDimensions {
            attribute: "viewBox",
            value: view_box.to_string(),
            detail: format!("expected 4 values, found {}", tokens.len()),
        });
    };

    Ok(Dimensions {
        width: positive_dimension("viewBox", view_box, width)?,
        height: positive_dimension("viewBox", view_box, height)?,
    })
}

fn positive_dimension(
    attribute: &'static str,
    value: &str,
    token: &str,
) -> Result<u32, SvgScaleError> {
    let malformed = |detail: String| SvgScaleError::MalformedDimensions {
        attribute,
        value: value.to_string(),
        detail,
    };

    let n = parse_leading_int(token)
        .ok_or_else(|| malformed(format!("'{token}' is not a number")))?;
    if n <= 0 {
        return Err(malformed(format!("'{token}' is not a positive size")));
    }
    u32::try_from(n).map_err(|_| malformed(format!("'{token}' is too large")))
}

/// Leading-integer parse: whitespace, optional sign, then at least one digit.
///
/// Saturates instead of overflowing; callers range-check the result.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let run = digits.bytes().take_while(u8::is_ascii_digit).count();
    if run == 0 {
        return None;
    }

    let magnitude = digits[..run].bytes().fold(0i64, |acc, d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}
