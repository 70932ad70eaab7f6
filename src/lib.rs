//! RFox Article Exporter
//!
//! Exports content-site article pages to paginated PDF (by rasterizing the
//! article and slicing the capture into pages) or to a print-ready HTML
//! document (for the browser print dialog).
//!
//! # Features
//!
//! - **Declarative extraction**: ordered `(selector, extractor)` rules per field
//! - **Raster capture**: one tall screenshot, paginated into fixed-size PDF pages
//! - **Print capture**: standalone A4 print document with screen preview
//! - **CDP rasterizer** (`cdp` feature): headless Chrome full-page capture
//! - **Image inlining** (`fetch` feature, default): best-effort, time-bounded
//!
//! # Example
//!
//! ```no_run
//! use rfexport::{CaptureStrategy, ExportConfig, Exporter};
//! use rfexport::rendering::PrerenderedRasterizer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExportConfig {
//!     strategy: CaptureStrategy::Raster,
//!     ..Default::default()
//! };
//! let html = std::fs::read_to_string("article.html")?;
//! let exporter = Exporter::new(config)?
//!     .with_rasterizer(PrerenderedRasterizer::from_file("article.png")?);
//! let output = exporter.export(&html)?;
//! output.save_in(".")?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod extract;
pub mod paginate;
pub mod pdf;
pub mod print;
pub mod rendering;
pub mod sanitize;

pub mod export;
pub use export::{paginate_to_pdf, sanitize_file_name, ExportOutput, Exporter};

// Best-effort image inlining over HTTP
#[cfg(feature = "fetch")]
pub mod assets;

// CDP rasterizer (headless Chrome)
#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly export worker
pub mod async_api;
pub use async_api::ExportWorker;

pub use extract::{Article, ArticleMeta, ExtractionRules};
pub use paginate::{PageGeometry, PageSlice, Pagination, SourceRaster};

/// How the article is turned into a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStrategy {
    /// Rasterize the export document and paginate it into a PDF
    #[default]
    Raster,
    /// Emit a print-styled HTML document for the browser print dialog
    Print,
}

/// Configuration for an export
///
/// Defaults match the A4 raster export: 794 × 1123 px pages with 72/96 px
/// margins, a 2× capture scale and JPEG quality 98.
///
/// # Examples
///
/// ```
/// let cfg = rfexport::ExportConfig::default();
/// assert_eq!(cfg.geometry.page_width, 794);
/// assert_eq!(cfg.capture_scale, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Capture strategy
    pub strategy: CaptureStrategy,
    /// Target page geometry in nominal pixels
    pub geometry: PageGeometry,
    /// Device pixels per nominal pixel used when rasterizing
    pub capture_scale: f32,
    /// JPEG quality (1-100) for page images
    pub jpeg_quality: u8,
    /// Whether to fetch article images and embed them before rendering
    pub inline_images: bool,
    /// Upper bound for the whole image fetch stage, in milliseconds
    pub image_timeout_ms: u64,
    /// How long the CDP rasterizer waits for the page to settle, in milliseconds
    pub ready_timeout_ms: u64,
    /// Base URL for resolving relative image links
    pub base_url: Option<String>,
    /// User agent string sent with image requests
    pub user_agent: String,
    /// Open the print dialog automatically (print strategy)
    pub auto_print: bool,
    /// Extraction rule table
    pub rules: ExtractionRules,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            strategy: CaptureStrategy::Raster,
            geometry: PageGeometry::default(),
            capture_scale: 2.0,
            jpeg_quality: 98,
            inline_images: true,
            image_timeout_ms: 20000,
            ready_timeout_ms: 30000,
            base_url: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX/0.3".to_string(),
            auto_print: false,
            rules: ExtractionRules::default(),
        }
    }
}

impl ExportConfig {
    /// Parse a (possibly partial) JSON configuration; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Reject settings that cannot produce an export.
    pub fn validate(&self) -> Result<()> {
        self.geometry.content_height()?;
        if !self.capture_scale.is_finite() || self.capture_scale <= 0.0 {
            return Err(Error::ConfigError(format!(
                "capture_scale must be positive, got {}",
                self.capture_scale
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        extract::CompiledRules::compile(&self.rules)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.strategy, CaptureStrategy::Raster);
        assert_eq!(config.geometry.page_height, 1123);
        assert_eq!(config.jpeg_quality, 98);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ExportConfig::from_json_str(
            r#"{"strategy": "print", "geometry": {"top_margin": 40}, "auto_print": true}"#,
        )
        .unwrap();
        assert_eq!(config.strategy, CaptureStrategy::Print);
        assert_eq!(config.geometry.top_margin, 40);
        assert_eq!(config.geometry.page_width, 794);
        assert!(config.auto_print);
        assert_eq!(config.rules, ExtractionRules::default());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = ExportConfig::from_json_str(r#"{"jpeg_quality": 0}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        let err = ExportConfig::from_json_str(r#"{"capture_scale": -1.0}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        let err = ExportConfig::from_json_str(r#"{"geometry": {"page_width": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry(_)));
        let err = ExportConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
