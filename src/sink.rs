//! Delivery of finished assets: download directory and clipboard.
//!
//! A download is a single file written as `{slug}.{ext}` into the sink's
//! directory; nothing else is created or retained. Clipboard delivery goes
//! through the [`Clipboard`] trait so the export pipeline stays testable;
//! the system-backed implementation lives behind the `system-clipboard`
//! feature.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    /// The filename would escape the download directory.
    #[error("invalid download filename: {0:?}")]
    InvalidFilename(String),

    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    /// The clipboard rejected the payload. Surfaced to the caller instead
    /// of being dropped.
    #[error("clipboard write failed: {0}")]
    Write(String),

    /// The payload's MIME type cannot go on the clipboard (images only).
    #[error("unsupported clipboard payload: {0}")]
    Unsupported(String),
}

// ============================================================================
// Download sink
// ============================================================================

/// Writes finished assets into a download directory.
///
/// # Example
///
/// ```no_run
/// use icondeck_exporter::DownloadSink;
///
/// let sink = DownloadSink::new("downloads");
/// let path = sink.deliver("rust.png", &[1, 2, 3])?;
/// assert!(path.ends_with("rust.png"));
/// # Ok::<(), icondeck_exporter::SinkError>(())
/// ```
pub struct DownloadSink {
    dir: PathBuf,
}

impl DownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory downloads land in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` as `filename` inside the download directory,
    /// creating the directory if needed. Returns the written path.
    pub fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, SinkError> {
        validate_filename(filename)?;

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;
        log::debug!("delivered {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Download names come from slugs plus a fixed extension; anything with
/// path structure is refused.
fn validate_filename(filename: &str) -> Result<(), SinkError> {
    let valid = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && !filename.starts_with('.')
        && !filename.contains("..");

    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidFilename(filename.to_string()))
    }
}

// ============================================================================
// Clipboard
// ============================================================================

/// A MIME-typed clipboard payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ClipboardItem {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }
}

/// Destination for copy flows.
///
/// Image payloads carry their real MIME type (PNG/JPEG only, no PDF copy
/// path); text is used for base64 data-URL copies.
pub trait Clipboard {
    fn write_image(&mut self, item: ClipboardItem) -> Result<(), ClipboardError>;
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// In-memory clipboard for tests and headless use.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub images: Vec<ClipboardItem>,
    pub texts: Vec<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_image(&self) -> Option<&ClipboardItem> {
        self.images.last()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.texts.last().map(String::as_str)
    }
}

impl Clipboard for MemoryClipboard {
    fn write_image(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        if !matches!(item.mime.as_str(), "image/png" | "image/jpeg") {
            return Err(ClipboardError::Unsupported(item.mime));
        }
        self.images.push(item);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.texts.push(text.to_string());
        Ok(())
    }
}

/// System clipboard backed by arboard.
///
/// Only available with the `system-clipboard` feature.
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = arboard::Clipboard::new().map_err(|e| ClipboardError::Write(e.to_string()))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn write_image(&mut self, item: ClipboardItem) -> Result<(), ClipboardError> {
        if !matches!(item.mime.as_str(), "image/png" | "image/jpeg") {
            return Err(ClipboardError::Unsupported(item.mime));
        }

        // The system clipboard takes decoded pixels, not encoded bytes.
        let decoded = image::load_from_memory(&item.bytes)
            .map_err(|e| ClipboardError::Write(e.to_string()))?
            .to_rgba8();
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);

        self.inner
            .set_image(arboard::ImageData {
                width,
                height,
                bytes: decoded.into_raw().into(),
            })
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_writes_the_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DownloadSink::new(dir.path());

        let path = sink.deliver("rust.png", b"not really a png").unwrap();
        assert_eq!(path, dir.path().join("rust.png"));
        assert_eq!(fs::read(&path).unwrap(), b"not really a png");
    }

    #[test]
    fn deliver_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports");
        let sink = DownloadSink::new(&nested);

        sink.deliver("icon.svg", b"<svg/>").unwrap();
        assert!(nested.join("icon.svg").exists());
    }

    #[test]
    fn path_structure_in_filenames_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DownloadSink::new(dir.path());

        for name in ["", "../escape.png", "a/b.png", ".hidden", "c\\d.png"] {
            let err = sink.deliver(name, b"x").unwrap_err();
            assert!(matches!(err, SinkError::InvalidFilename(_)), "{name:?}");
        }
    }

    #[test]
    fn memory_clipboard_records_typed_images() {
        let mut clipboard = MemoryClipboard::new();
        clipboard
            .write_image(ClipboardItem::new("image/png", vec![1, 2, 3]))
            .unwrap();

        let item = clipboard.last_image().unwrap();
        assert_eq!(item.mime, "image/png");
        assert_eq!(item.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn clipboard_refuses_non_image_payloads() {
        let mut clipboard = MemoryClipboard::new();
        let err = clipboard
            .write_image(ClipboardItem::new("application/pdf", vec![1]))
            .unwrap_err();
        assert!(matches!(err, ClipboardError::Unsupported(_)));
    }

    #[test]
    fn memory_clipboard_records_text() {
        let mut clipboard = MemoryClipboard::new();
        clipboard.write_text("data:image/png;base64,AAAA").unwrap();
        assert_eq!(clipboard.last_text(), Some("data:image/png;base64,AAAA"));
    }
}
