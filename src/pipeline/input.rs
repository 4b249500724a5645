//! Input resolution: turn a path or an in-memory upload into SVG text.
//!
//! The upload keeps its raw bytes so the preview can report the original
//! file size; decoding to text happens separately and is where non-UTF-8
//! input is rejected.

use crate::error::SvgScaleError;
use crate::naming::file_size_text;
use std::path::Path;
use tracing::debug;

/// A file as handed over by the user: its name and raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Human-readable size, e.g. `"1.5 kilobytes"`.
    pub fn size_text(&self) -> String {
        file_size_text(self.size())
    }

    /// Decode the contents as UTF-8 text, dropping a leading byte-order mark.
    pub fn text(&self) -> Result<&str, SvgScaleError> {
        let text = std::str::from_utf8(&self.bytes).map_err(|e| SvgScaleError::ReadFailure {
            name: self.name.clone(),
            detail: format!("file is not valid UTF-8 text: {e}"),
        })?;
        Ok(text.strip_prefix('\u{FEFF}').unwrap_or(text))
    }
}

/// Read a local file into an [`Upload`] named after its final path component.
pub async fn read_path(path: &Path) -> Result<Upload, SvgScaleError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SvgScaleError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => SvgScaleError::ReadFailure {
            name: name.clone(),
            detail: e.to_string(),
        },
    })?;

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(Upload { name, bytes })
}
