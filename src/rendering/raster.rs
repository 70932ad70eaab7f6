//! Raster decoding, slice extraction and page image encoding

use crate::paginate::{PageSlice, SourceRaster};
use crate::rendering::Screenshot;
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// A decoded capture, flattened onto a white background
pub struct DecodedRaster {
    pixels: RgbImage,
}

impl DecodedRaster {
    pub fn decode(screenshot: &Screenshot) -> Result<Self> {
        let rgba = image::load_from_memory(&screenshot.data)?.to_rgba8();
        let (w, h) = rgba.dimensions();
        let mut pixels = RgbImage::new(w, h);
        for (dst, src) in pixels.pixels_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            let a = u16::from(a);
            let over_white = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
            dst.0 = [over_white(r), over_white(g), over_white(b)];
        }
        Ok(Self { pixels })
    }

    pub fn dimensions(&self) -> SourceRaster {
        let (width, height) = self.pixels.dimensions();
        SourceRaster { width, height }
    }

    /// Copy one slice's rows into a new same-width raster.
    pub fn slice(&self, slice: &PageSlice) -> Result<RgbImage> {
        let (w, h) = self.pixels.dimensions();
        let end = u64::from(slice.source_y) + u64::from(slice.height);
        if slice.height == 0 || end > u64::from(h) {
            return Err(Error::RenderError(format!(
                "slice {} (rows {}..{}) is outside the {}px raster",
                slice.index, slice.source_y, end, h
            )));
        }
        let row = w as usize * 3;
        let start = slice.source_y as usize * row;
        let len = slice.height as usize * row;
        let rows = self.pixels.as_raw()[start..start + len].to_vec();
        RgbImage::from_raw(w, slice.height, rows)
            .ok_or_else(|| Error::RenderError("slice buffer size mismatch".into()))
    }
}

/// JPEG-encode a page image at the given quality (1-100)
pub fn encode_jpeg(page: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
        page.as_raw(),
        page.width(),
        page.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}
