//! Page paint commands consumed by the document encoder

/// A rectangle on an output page, in nominal units with a top-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Draw a JPEG image into the given rectangle
    Image {
        placement: Placement,
        pixel_width: u32,
        pixel_height: u32,
        jpeg: Vec<u8>,
    },
    /// Start a new page
    NewPage,
}
