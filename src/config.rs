//! Exporter configuration.
//!
//! A serializable settings bag for the export pipeline, suitable for
//! loading from JSON alongside the rest of the site configuration.
//!
//! # Example
//!
//! ```
//! use icondeck_exporter::ExporterConfig;
//!
//! let config = ExporterConfig::from_json(
//!     r#"{ "baseUrl": "https://icons.example.org", "rasterSize": 480 }"#,
//! ).unwrap();
//! assert_eq!(config.raster_size, 480);
//!
//! let json = config.to_json().unwrap();
//! assert!(json.contains("baseUrl"));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pdf::PdfStyle;
use crate::raster::RasterTarget;

/// Settings for an [`Exporter`](crate::Exporter).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExporterConfig {
    /// Base URL of the asset server icons are fetched from.
    pub base_url: String,

    /// Square raster target edge for PNG/JPEG exports, in pixels.
    pub raster_size: u32,

    /// How PDF exports render the icon.
    pub pdf_style: PdfStyle,

    /// Prefix of the message shown in the substituted error document when
    /// PDF rendering fails.
    pub pdf_error_message: String,

    /// Global timeout for one icon fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Deadline for shared libraries to become ready, in seconds.
    pub library_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            raster_size: RasterTarget::ICON_EXPORT.width,
            pdf_style: PdfStyle::default(),
            pdf_error_message: "Error generating PDF:".to_string(),
            fetch_timeout_secs: 30,
            library_timeout_secs: 60,
        }
    }
}

impl ExporterConfig {
    /// A default configuration pointed at the given asset server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// The raster target raster exports draw into.
    pub fn raster_target(&self) -> RasterTarget {
        RasterTarget::square(self.raster_size)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn library_timeout(&self) -> Duration {
        Duration::from_secs(self.library_timeout_secs)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a configuration from JSON. Missing fields fall back
    /// to their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
