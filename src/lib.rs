//! icondeck-exporter: asset export engine for an icon gallery
//!
//! This crate converts icons, fetched as SVG markup by slug, into
//! downloadable or copyable assets: the original SVG, fixed-size PNG/JPEG
//! rasters, or a PDF with the icon filled as vector geometry. It also
//! provides the gallery's fuzzy search index and the lazy loader for
//! shared heavyweight libraries.
//!
//! # Example
//!
//! ```no_run
//! use icondeck_exporter::{
//!     DownloadSink, Exporter, ExporterConfig, ExportFormat, MemoryClipboard, RasterFormat,
//! };
//!
//! let exporter = Exporter::new(ExporterConfig::new("https://icons.example.org"));
//!
//! // Download rust.png into ./downloads, rasterized at the configured size.
//! let sink = DownloadSink::new("downloads");
//! exporter.download("rust", ExportFormat::Png, &sink)?;
//!
//! // Copy the same icon to a clipboard as a typed image payload.
//! let mut clipboard = MemoryClipboard::new();
//! exporter.copy_as_image("rust", RasterFormat::Png, &mut clipboard)?;
//! # Ok::<(), icondeck_exporter::ExportError>(())
//! ```
//!
//! # Search
//!
//! ```
//! use icondeck_exporter::{Candidate, Searcher, SearcherOptions};
//!
//! let searcher = Searcher::new();
//! searcher.rebuild(
//!     vec![Candidate::with_aliases("PostgreSQL", ["postgres"], 0)],
//!     SearcherOptions::default(),
//! );
//! let hits = searcher.search("postgre").unwrap();
//! assert_eq!(hits[0].id, 0);
//! ```
//!
//! # Failure policy
//!
//! Fetch, decode and delivery failures propagate to the caller. The one
//! deliberate recovery is PDF rendering: a failure there is logged and a
//! minimal error document is substituted, so a download is always
//! produced. Logging goes through the [`log`] facade; initialize whatever
//! logger the embedding application uses.

mod config;
mod encode;
mod export;
mod fetch;
mod loader;
mod pdf;
mod raster;
mod search;
mod sink;

pub use config::ExporterConfig;
pub use encode::{encode_raster, to_data_url, to_download_data_url, EncodeError, RasterFormat};
pub use export::{ExportError, ExportFormat, ExportedAsset, Exporter, ParseFormatError};
pub use fetch::{FetchError, IconFetcher};
pub use loader::{LazyLibrary, LoaderError};
pub use pdf::{error_document, render_embedded_raster, render_vector, PdfError, PdfStyle};
pub use raster::{rasterize, shared_fontdb, RasterError, RasterTarget};
pub use search::{
    Candidate, SearchError, SearchHit, SearchIndex, Searcher, SearcherOptions,
};
pub use sink::{
    Clipboard, ClipboardError, ClipboardItem, DownloadSink, MemoryClipboard, SinkError,
};

#[cfg(feature = "system-clipboard")]
pub use sink::SystemClipboard;
