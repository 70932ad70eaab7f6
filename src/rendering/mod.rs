//! Rendering: export document layout, rasterizer contract, raster slicing and
//! page paint commands.

pub mod layout;
pub mod paint;
pub mod raster;

use crate::{Error, Result};
use std::path::Path;

/// An encoded capture of the export document (PNG or JPEG bytes)
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Screenshot {
    /// Wrap encoded image bytes, reading the pixel dimensions from the header.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(&data))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self { width, height, data })
    }
}

/// Turns an export document into pixels.
///
/// Implementations receive the complete export HTML, the nominal page width
/// the document was laid out for, and the capture scale (device pixels per
/// nominal pixel). The returned screenshot should be `width * scale` pixels
/// wide and tall enough to hold the whole document.
pub trait Rasterizer {
    fn rasterize(&mut self, document_html: &str, width: u32, scale: f32) -> Result<Screenshot>;
}

/// A rasterizer that hands out a capture produced elsewhere (for example a
/// full-page browser screenshot saved to disk).
#[derive(Debug, Clone)]
pub struct PrerenderedRasterizer {
    screenshot: Screenshot,
}

impl PrerenderedRasterizer {
    pub fn new(screenshot: Screenshot) -> Self {
        Self { screenshot }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| Error::RenderError(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Self::new(Screenshot::from_bytes(data)?))
    }
}

impl Rasterizer for PrerenderedRasterizer {
    fn rasterize(&mut self, _document_html: &str, width: u32, scale: f32) -> Result<Screenshot> {
        let expected = (width as f32 * scale).round() as u32;
        if self.screenshot.width != expected {
            log::warn!(
                "prerendered capture is {}px wide, expected {}px for a {}px page at {}x",
                self.screenshot.width,
                expected,
                width,
                scale
            );
        }
        Ok(self.screenshot.clone())
    }
}
