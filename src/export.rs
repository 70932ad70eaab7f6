//! The export pipeline: extract, optionally inline images, then capture with
//! the configured strategy.
//!
//! Only one export runs at a time per [`Exporter`]; a concurrent call fails
//! with [`Error::Busy`]. Any failure abandons the export and nothing is
//! returned or written.

use crate::extract::{Article, CompiledRules};
use crate::paginate::{PageGeometry, Pagination};
use crate::pdf::PdfEncoder;
use crate::print::{render_print_document, PrintOptions};
use crate::rendering::layout::layout_document;
use crate::rendering::paint::PaintCommand;
use crate::rendering::raster::{encode_jpeg, DecodedRaster};
use crate::rendering::{Rasterizer, Screenshot};
use crate::{CaptureStrategy, Error, ExportConfig, Result};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use scraper::Html;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const FALLBACK_FILE_STEM: &str = "dedao-article";

/// Replace characters that are illegal in file names on common filesystems.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Slice a capture into pages and encode them as a PDF.
///
/// Returns the PDF bytes and the number of pages written.
pub fn paginate_to_pdf(
    screenshot: &Screenshot,
    geometry: &PageGeometry,
    jpeg_quality: u8,
    title: &str,
) -> Result<(Vec<u8>, usize)> {
    let raster = DecodedRaster::decode(screenshot)?;
    let plan = Pagination::new(raster.dimensions(), *geometry)?;
    debug!(
        "paginating {}x{} capture: scale {}, {} rows per page, {} pages",
        plan.source().width,
        plan.source().height,
        plan.scale_factor(),
        plan.slice_height(),
        plan.total_pages()
    );

    let mut encoder = PdfEncoder::new(geometry, title);
    for slice in plan.slices() {
        if slice.index > 0 {
            encoder.paint(PaintCommand::NewPage)?;
        }
        let page = raster.slice(&slice)?;
        let jpeg = encode_jpeg(&page, jpeg_quality)?;
        encoder.paint(PaintCommand::Image {
            placement: plan.placement(&slice),
            pixel_width: page.width(),
            pixel_height: page.height(),
            jpeg,
        })?;
    }
    let pages = encoder.page_count();
    Ok((encoder.finish()?, pages))
}

/// A finished export, held in memory until saved
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// Number of PDF pages (raster strategy only)
    pub page_count: Option<usize>,
}

impl ExportOutput {
    /// Hex SHA-256 of the output bytes
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Write the output into `dir` under its sanitized file name.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// a failed write never leaves a partial document behind.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        let partial = dir.as_ref().join(format!(".{}.part", self.filename));
        if let Err(e) = std::fs::write(&partial, &self.bytes) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }
        std::fs::rename(&partial, &path)?;
        info!("Export finished: {} ({})", path.display(), self.digest());
        Ok(path)
    }
}

/// Resets the busy flag when an export ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

type BoxedRasterizer = Box<dyn Rasterizer + Send>;

/// Runs exports with a fixed configuration
pub struct Exporter {
    config: ExportConfig,
    rules: CompiledRules,
    rasterizer: Mutex<Option<BoxedRasterizer>>,
    busy: AtomicBool,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Result<Self> {
        config.validate()?;
        let rules = CompiledRules::compile(&config.rules)?;
        Ok(Self { config, rules, rasterizer: Mutex::new(None), busy: AtomicBool::new(false) })
    }

    /// Use `rasterizer` for the raster capture strategy.
    pub fn with_rasterizer(self, rasterizer: impl Rasterizer + Send + 'static) -> Self {
        let boxed: BoxedRasterizer = Box::new(rasterizer);
        if let Ok(mut slot) = self.rasterizer.lock() {
            *slot = Some(boxed);
        }
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Whether an export is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export the article contained in `html`.
    pub fn export(&self, html: &str) -> Result<ExportOutput> {
        self.export_at(html, Local::now())
    }

    /// Export with an explicit export timestamp (shown in the document header).
    pub fn export_at(&self, html: &str, exported_at: DateTime<Local>) -> Result<ExportOutput> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let exported_at = exported_at.format("%Y-%m-%d %H:%M:%S").to_string();

        let mut article = self.rules.extract(&Html::parse_document(html))?;
        self.inline_images(&mut article);

        let stem = sanitize_file_name(&article.meta.title);
        match self.config.strategy {
            CaptureStrategy::Raster => {
                let document = layout_document(&article, &self.config.geometry, &exported_at);
                let screenshot = self.rasterize(&document)?;
                let (bytes, pages) = paginate_to_pdf(
                    &screenshot,
                    &self.config.geometry,
                    self.config.jpeg_quality,
                    &article.meta.title,
                )?;
                Ok(ExportOutput {
                    filename: format!("{}.pdf", stem),
                    bytes,
                    mime_type: "application/pdf",
                    page_count: Some(pages),
                })
            }
            CaptureStrategy::Print => {
                let options = PrintOptions { auto_print: self.config.auto_print };
                let document = render_print_document(&article, &exported_at, &options)?;
                Ok(ExportOutput {
                    filename: format!("{}.html", stem),
                    bytes: document.into_bytes(),
                    mime_type: "text/html",
                    page_count: None,
                })
            }
        }
    }

    fn rasterize(&self, document: &str) -> Result<Screenshot> {
        let mut slot = self
            .rasterizer
            .lock()
            .map_err(|_| Error::Other("rasterizer lock poisoned".into()))?;
        if slot.is_none() {
            *slot = Some(self.default_rasterizer()?);
        }
        match slot.as_mut() {
            Some(r) => r.rasterize(document, self.config.geometry.page_width, self.config.capture_scale),
            None => Err(Error::Other("no rasterizer available".into())),
        }
    }

    #[cfg(feature = "cdp")]
    fn default_rasterizer(&self) -> Result<BoxedRasterizer> {
        Ok(Box::new(crate::cdp::CdpRasterizer::new(&self.config)?))
    }

    #[cfg(not(feature = "cdp"))]
    fn default_rasterizer(&self) -> Result<BoxedRasterizer> {
        Err(Error::ConfigError(
            "raster capture needs a prerendered screenshot (or the `cdp` feature)".into(),
        ))
    }

    #[cfg(feature = "fetch")]
    fn inline_images(&self, article: &mut Article) {
        if !self.config.inline_images {
            return;
        }
        let options = crate::assets::FetchOptions {
            base_url: self.config.base_url.clone(),
            user_agent: self.config.user_agent.clone(),
            timeout: std::time::Duration::from_millis(self.config.image_timeout_ms),
        };
        match crate::assets::inline_images(article, &options) {
            Ok(n) => debug!("inlined {} of {} images", n, article.body.images.len()),
            Err(e) => warn!("image inlining skipped: {}", e),
        }
    }

    #[cfg(not(feature = "fetch"))]
    fn inline_images(&self, article: &mut Article) {
        if self.config.inline_images && !article.body.images.is_empty() {
            warn!("built without the `fetch` feature; {} images left as links", article.body.images.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::raster::tests::solid_png;
    use crate::rendering::PrerenderedRasterizer;

    const PAGE: &str = r#"<html><head><title>Fallback - 得到APP</title></head><body>
        <h1 class="article-title">Ch. 3: "Compound" interest?</h1>
        <div class="article-body"><p>Body text that is long enough to be exported by either strategy.</p></div>
        </body></html>"#;

    fn exporter(strategy: CaptureStrategy) -> Exporter {
        let config = ExportConfig { strategy, inline_images: false, ..Default::default() };
        Exporter::new(config).unwrap()
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name(" a/b\\c:d*e?f\"g<h>i|j "), "a-b-c-d-e-f-g-h-i-j");
        assert_eq!(sanitize_file_name("   "), "dedao-article");
        assert_eq!(sanitize_file_name("第1讲"), "第1讲");
    }

    #[test]
    fn raster_export_produces_paginated_pdf() {
        let shot = Screenshot::from_bytes(solid_png(1588, 3000, [255, 255, 255, 255])).unwrap();
        let exporter = exporter(CaptureStrategy::Raster).with_rasterizer(PrerenderedRasterizer::new(shot));
        let out = exporter.export(PAGE).unwrap();
        assert_eq!(out.filename, "Ch. 3- -Compound- interest-.pdf");
        assert_eq!(out.page_count, Some(2));
        assert_eq!(out.mime_type, "application/pdf");
        assert!(out.bytes.starts_with(b"%PDF"));
        assert!(!exporter.is_busy());
    }

    #[test]
    fn print_export_produces_html() {
        let out = exporter(CaptureStrategy::Print).export(PAGE).unwrap();
        assert!(out.filename.ends_with(".html"));
        assert_eq!(out.page_count, None);
        let html = String::from_utf8(out.bytes).unwrap();
        assert!(html.contains("Body text that is long enough"));
    }

    #[cfg(not(feature = "cdp"))]
    #[test]
    fn raster_export_without_rasterizer_fails() {
        let err = exporter(CaptureStrategy::Raster).export(PAGE).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn busy_flag_rejects_concurrent_exports() {
        let exporter = exporter(CaptureStrategy::Print);
        let guard = BusyGuard::acquire(&exporter.busy).unwrap();
        assert!(matches!(exporter.export(PAGE), Err(Error::Busy)));
        drop(guard);
        assert!(exporter.export(PAGE).is_ok());
    }

    #[test]
    fn failed_export_releases_busy_flag() {
        let exporter = exporter(CaptureStrategy::Print);
        assert!(exporter.export("<html><body></body></html>").is_err());
        assert!(!exporter.is_busy());
    }

    #[test]
    fn empty_capture_aborts_export() {
        let shot = Screenshot { width: 0, height: 0, data: vec![] };
        let exporter = exporter(CaptureStrategy::Raster).with_rasterizer(PrerenderedRasterizer::new(shot));
        assert!(exporter.export(PAGE).is_err());
    }

    #[test]
    fn digest_is_stable() {
        let out = ExportOutput { filename: "a.pdf".into(), bytes: b"abc".to_vec(), mime_type: "application/pdf", page_count: Some(1) };
        assert_eq!(out.digest(), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
