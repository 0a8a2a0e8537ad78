//! Export orchestration: one job per call, fetch → rasterize → encode →
//! deliver.
//!
//! Steps within a job are strictly sequential. Jobs share nothing with
//! each other beyond the process-wide shared libraries and whatever sink
//! the caller hands in, so concurrent exports cannot interfere.
//!
//! The PDF path carries the one deliberate recovery in the pipeline: when
//! rendering fails, the failure is logged and a minimal error document is
//! substituted, so the user always ends up with a downloadable file. That
//! substitution happens here, at the call site, not inside the encoder.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;
use resvg::usvg::fontdb;
use thiserror::Error;

use crate::config::ExporterConfig;
use crate::encode::{encode_raster, to_data_url, EncodeError, RasterFormat};
use crate::fetch::{FetchError, IconFetcher};
use crate::loader::LoaderError;
use crate::pdf::{self, PdfStyle};
use crate::raster::{rasterize, shared_fontdb, RasterError};
use crate::sink::{Clipboard, ClipboardError, ClipboardItem, DownloadSink, SinkError};

/// Failures an export job can surface.
///
/// PDF rendering failures are absent on purpose: they are recovered by
/// substituting an error document.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Library(#[from] LoaderError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

// ============================================================================
// Export format
// ============================================================================

/// The output formats an icon can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
    Jpg,
    Pdf,
}

#[derive(Error, Debug)]
#[error("unknown export format: {0:?}")]
pub struct ParseFormatError(String);

impl FromStr for ExportFormat {
    type Err = ParseFormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "pdf" => Ok(Self::Pdf),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

impl ExportFormat {
    /// File extension used in download names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the exported bytes.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }
}

impl core::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.extension())
    }
}

impl From<RasterFormat> for ExportFormat {
    fn from(format: RasterFormat) -> Self {
        match format {
            RasterFormat::Png => Self::Png,
            RasterFormat::Jpg => Self::Jpg,
        }
    }
}

/// A finished export, ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedAsset {
    /// Download name: `{slug}.{ext}`.
    pub filename: String,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

// ============================================================================
// Exporter
// ============================================================================

/// The export engine: converts an icon slug into downloadable or copyable
/// bytes in the requested format.
///
/// # Example
///
/// ```no_run
/// use icondeck_exporter::{DownloadSink, Exporter, ExporterConfig, ExportFormat};
///
/// let exporter = Exporter::new(ExporterConfig::new("https://icons.example.org"));
/// let sink = DownloadSink::new("downloads");
///
/// let path = exporter.download("rust", ExportFormat::Png, &sink)?;
/// assert!(path.ends_with("rust.png"));
/// # Ok::<(), icondeck_exporter::ExportError>(())
/// ```
pub struct Exporter {
    config: ExporterConfig,
    fetcher: IconFetcher,
}

impl Exporter {
    pub fn new(config: ExporterConfig) -> Self {
        let fetcher = IconFetcher::new(config.base_url.clone(), config.fetch_timeout());
        Self { config, fetcher }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Runs one export job and returns the finished asset.
    pub fn export(&self, slug: &str, format: ExportFormat) -> Result<ExportedAsset, ExportError> {
        let svg = self.fetcher.fetch_svg(slug)?;

        let bytes = match format {
            // SVG downloads are the fetched markup, byte for byte.
            ExportFormat::Svg => svg.into_bytes(),
            ExportFormat::Png => {
                let image = self.rasterize_markup(&svg)?;
                encode_raster(&image, RasterFormat::Png)?
            }
            ExportFormat::Jpg => {
                let image = self.rasterize_markup(&svg)?;
                encode_raster(&image, RasterFormat::Jpg)?
            }
            ExportFormat::Pdf => self.render_pdf(slug, &svg)?,
        };

        Ok(ExportedAsset {
            filename: format!("{}.{}", slug, format.extension()),
            mime: format.mime(),
            bytes,
        })
    }

    /// Exports and writes the asset into the download sink.
    pub fn download(
        &self,
        slug: &str,
        format: ExportFormat,
        sink: &DownloadSink,
    ) -> Result<PathBuf, ExportError> {
        let asset = self.export(slug, format)?;
        Ok(sink.deliver(&asset.filename, &asset.bytes)?)
    }

    /// Exports a raster format and places the image on the clipboard with
    /// its real MIME type.
    pub fn copy_as_image(
        &self,
        slug: &str,
        format: RasterFormat,
        clipboard: &mut dyn Clipboard,
    ) -> Result<(), ExportError> {
        let asset = self.export(slug, format.into())?;
        clipboard.write_image(ClipboardItem::new(format.mime(), asset.bytes))?;
        Ok(())
    }

    /// Exports a raster format and places its base64 data URL on the
    /// clipboard as text. The data URL keeps the original MIME type.
    pub fn copy_as_base64(
        &self,
        slug: &str,
        format: RasterFormat,
        clipboard: &mut dyn Clipboard,
    ) -> Result<(), ExportError> {
        let asset = self.export(slug, format.into())?;
        clipboard.write_text(&to_data_url(&asset.bytes, format.mime()))?;
        Ok(())
    }

    fn rasterize_markup(&self, svg: &str) -> Result<RgbaImage, ExportError> {
        let fonts = self.fonts()?;
        Ok(rasterize(svg, self.config.raster_target(), fonts)?)
    }

    fn fonts(&self) -> Result<Arc<fontdb::Database>, ExportError> {
        Ok(shared_fontdb().get(self.config.library_timeout())?)
    }

    /// PDF rendering with the always-produce-something policy: a failure
    /// is logged and replaced by an error document carrying the message.
    fn render_pdf(&self, slug: &str, svg: &str) -> Result<Vec<u8>, ExportError> {
        let rendered = match self.config.pdf_style {
            PdfStyle::Vector => pdf::render_vector(svg),
            PdfStyle::EmbeddedRaster => {
                // A failed decode is a real export failure, not a PDF one.
                let image = self.rasterize_markup(svg)?;
                pdf::render_embedded_raster(&image)
            }
        };

        Ok(match rendered {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("PDF generation for {slug:?} failed: {err}");
                pdf::error_document(&format!("{} {}", self.config.pdf_error_message, err))
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
