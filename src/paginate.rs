//! Pagination of one tall raster into fixed-size page slices.
//!
//! A full article is rasterized as a single image whose width corresponds to
//! the nominal page width (at some capture scale). [`Pagination`] cuts that
//! image into horizontal bands, each filling the printable area of one page,
//! and tells the document encoder where each band goes on its page.
//!
//! ```
//! use rfexport::paginate::{PageGeometry, Pagination, SourceRaster};
//!
//! let source = SourceRaster { width: 1588, height: 3000 };
//! let plan = Pagination::new(source, PageGeometry::default()).unwrap();
//! let heights: Vec<u32> = plan.slices().map(|s| s.height).collect();
//! assert_eq!(heights, vec![1910, 1090]);
//! ```

use crate::rendering::paint::Placement;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the rasterized article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRaster {
    pub width: u32,
    pub height: u32,
}

/// Target page dimensions in nominal pixels
///
/// The default is A4 at 96 dpi with the exporter's top/bottom margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: u32,
    pub page_height: u32,
    pub top_margin: u32,
    pub bottom_margin: u32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 794,
            page_height: 1123,
            top_margin: 72,
            bottom_margin: 96,
        }
    }
}

impl PageGeometry {
    /// Printable height per page in nominal units
    pub fn content_height(&self) -> Result<u32> {
        if self.page_width == 0 || self.page_height == 0 {
            return Err(Error::DegenerateGeometry(format!(
                "page size {}x{} has a zero dimension",
                self.page_width, self.page_height
            )));
        }
        let margins = self.top_margin.saturating_add(self.bottom_margin);
        if self.page_height <= margins {
            return Err(Error::DegenerateGeometry(format!(
                "margins {}+{} leave no printable area on a {}px page",
                self.top_margin, self.bottom_margin, self.page_height
            )));
        }
        Ok(self.page_height - margins)
    }
}

/// One page's band of source rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSlice {
    /// 0-based page number
    pub index: usize,
    /// First source row of the band
    pub source_y: u32,
    /// Number of source rows in the band
    pub height: u32,
}

/// A validated pagination plan for one source raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    source: SourceRaster,
    geometry: PageGeometry,
    scale_factor: f64,
    content_height: u32,
    slice_height: u32,
    total_pages: usize,
}

impl Pagination {
    pub fn new(source: SourceRaster, geometry: PageGeometry) -> Result<Self> {
        let content_height = geometry.content_height()?;
        if source.height == 0 {
            return Err(Error::EmptySource);
        }

        let scale_factor = f64::from(source.width) / f64::from(geometry.page_width);
        let slice_height = (f64::from(content_height) * scale_factor).floor();
        if !slice_height.is_finite() || slice_height < 1.0 {
            return Err(Error::DegenerateGeometry(format!(
                "a {}px wide raster on a {}px page maps to a zero-height slice",
                source.width, geometry.page_width
            )));
        }
        let slice_height = if slice_height >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            slice_height as u32
        };
        let total_pages = (source.height.div_ceil(slice_height) as usize).max(1);

        Ok(Self {
            source,
            geometry,
            scale_factor,
            content_height,
            slice_height,
            total_pages,
        })
    }

    pub fn source(&self) -> SourceRaster {
        self.source
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Source pixels per nominal page pixel
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn content_height(&self) -> u32 {
        self.content_height
    }

    /// Source rows per full page
    pub fn slice_height(&self) -> u32 {
        self.slice_height
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// A fresh iterator over every page slice, in page order
    pub fn slices(&self) -> Slices {
        Slices {
            source_height: self.source.height,
            slice_height: self.slice_height,
            next_index: 0,
            total_pages: self.total_pages,
        }
    }

    /// Where a slice lands on its page, in nominal units
    pub fn placement(&self, slice: &PageSlice) -> Placement {
        Placement {
            x: 0.0,
            y: f64::from(self.geometry.top_margin),
            width: f64::from(self.geometry.page_width),
            height: f64::from(slice.height) / self.scale_factor,
        }
    }
}

/// Lazy iterator returned by [`Pagination::slices`]
#[derive(Debug, Clone)]
pub struct Slices {
    source_height: u32,
    slice_height: u32,
    next_index: usize,
    total_pages: usize,
}

impl Iterator for Slices {
    type Item = PageSlice;

    fn next(&mut self) -> Option<PageSlice> {
        if self.next_index >= self.total_pages {
            return None;
        }
        let source_y = (self.next_index as u64) * u64::from(self.slice_height);
        if source_y >= u64::from(self.source_height) {
            self.next_index = self.total_pages;
            return None;
        }
        // source_y < source_height, so it fits in u32
        let source_y = source_y as u32;
        let slice = PageSlice {
            index: self.next_index,
            source_y,
            height: self.slice_height.min(self.source_height - source_y),
        };
        self.next_index += 1;
        Some(slice)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_pages - self.next_index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Slices {}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(width: u32, height: u32) -> Result<Pagination> {
        Pagination::new(SourceRaster { width, height }, PageGeometry::default())
    }

    #[test]
    fn reference_a4_export_splits_into_two_pages() {
        let p = plan(1588, 3000).unwrap();
        assert_eq!(p.content_height(), 955);
        assert_eq!(p.scale_factor(), 2.0);
        assert_eq!(p.slice_height(), 1910);
        assert_eq!(p.total_pages(), 2);

        let slices: Vec<_> = p.slices().collect();
        assert_eq!(slices[0], PageSlice { index: 0, source_y: 0, height: 1910 });
        assert_eq!(slices[1], PageSlice { index: 1, source_y: 1910, height: 1090 });
    }

    #[test]
    fn heights_cover_source_exactly() {
        for height in [1, 2, 1909, 1910, 1911, 3820, 3821, 10_000, 123_457] {
            let p = plan(1588, height).unwrap();
            let slices: Vec<_> = p.slices().collect();
            assert_eq!(slices.len(), p.total_pages());
            assert_eq!(slices.iter().map(|s| s.height as u64).sum::<u64>(), height as u64);

            let mut expected_y = 0;
            for s in &slices[..slices.len() - 1] {
                assert_eq!(s.source_y, expected_y);
                assert_eq!(s.height, p.slice_height());
                expected_y += s.height;
            }
            assert_eq!(slices.last().unwrap().source_y, expected_y);
        }
    }

    #[test]
    fn short_source_is_a_single_page() {
        let p = plan(1588, 1910).unwrap();
        assert_eq!(p.total_pages(), 1);
        let p = plan(1588, 40).unwrap();
        assert_eq!(p.total_pages(), 1);
        assert_eq!(p.slices().next().unwrap().height, 40);
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(matches!(plan(1588, 0), Err(Error::EmptySource)));
    }

    #[test]
    fn zero_page_width_is_degenerate() {
        let geometry = PageGeometry { page_width: 0, ..Default::default() };
        let res = Pagination::new(SourceRaster { width: 1588, height: 3000 }, geometry);
        assert!(matches!(res, Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn zero_source_width_is_degenerate() {
        assert!(matches!(plan(0, 3000), Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn margins_covering_the_page_are_degenerate() {
        let geometry = PageGeometry { top_margin: 600, bottom_margin: 523, ..Default::default() };
        let res = Pagination::new(SourceRaster { width: 794, height: 10 }, geometry);
        assert!(matches!(res, Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn zero_margins_use_the_whole_page() {
        let geometry = PageGeometry { top_margin: 0, bottom_margin: 0, ..Default::default() };
        let p = Pagination::new(SourceRaster { width: 794, height: 2246 }, geometry).unwrap();
        assert_eq!(p.content_height(), 1123);
        assert_eq!(p.slice_height(), 1123);
        assert_eq!(p.total_pages(), 2);
        let first = p.slices().next().unwrap();
        assert_eq!(p.placement(&first).y, 0.0);
    }

    #[test]
    fn tiny_scale_flooring_to_zero_is_degenerate() {
        // 1px wide raster on a 794px page: 955 / 794 < 1 row per page
        assert!(matches!(plan(1, 3000), Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn slices_restart_and_are_identical() {
        let p = plan(1588, 5000).unwrap();
        let first: Vec<_> = p.slices().collect();
        let second: Vec<_> = p.slices().collect();
        assert_eq!(first, second);
        assert_eq!(plan(1588, 5000).unwrap(), p);
    }

    #[test]
    fn iterator_reports_exact_length() {
        let p = plan(1588, 5000).unwrap();
        let mut it = p.slices();
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
    }

    #[test]
    fn placement_converts_back_to_nominal_units() {
        let p = plan(1588, 3000).unwrap();
        let slices: Vec<_> = p.slices().collect();
        let first = p.placement(&slices[0]);
        assert_eq!(first.x, 0.0);
        assert_eq!(first.y, 72.0);
        assert_eq!(first.width, 794.0);
        assert_eq!(first.height, 955.0);
        assert_eq!(p.placement(&slices[1]).height, 545.0);
    }
}
