//! PDF assembly for paginated page images.
//!
//! Pages use a pixel unit system (1 px = 0.75 pt, i.e. 96 dpi) with a fixed
//! page size. Each [`PaintCommand::Image`] becomes a `DCTDecode` image XObject
//! drawn on the current page; [`PaintCommand::NewPage`] starts the next page.

use crate::paginate::PageGeometry;
use crate::rendering::paint::{PaintCommand, Placement};
use crate::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Points per nominal pixel
pub const PT_PER_PX: f64 = 0.75;

#[derive(Default)]
struct PageBuilder {
    operations: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
}

/// Accumulates paint commands into a PDF document
pub struct PdfEncoder {
    doc: Document,
    pages_id: ObjectId,
    page_width: f64,
    page_height: f64,
    pages: Vec<ObjectId>,
    current: Option<PageBuilder>,
}

impl PdfEncoder {
    pub fn new(geometry: &PageGeometry, title: &str) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(title),
            "Producer" => Object::string_literal(concat!("rfexport ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Info", info_id);
        Self {
            doc,
            pages_id,
            page_width: f64::from(geometry.page_width) * PT_PER_PX,
            page_height: f64::from(geometry.page_height) * PT_PER_PX,
            pages: Vec::new(),
            current: Some(PageBuilder::default()),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    pub fn paint(&mut self, command: PaintCommand) -> Result<()> {
        match command {
            PaintCommand::NewPage => {
                self.finish_page()?;
                self.current = Some(PageBuilder::default());
            }
            PaintCommand::Image { placement, pixel_width, pixel_height, jpeg } => {
                if pixel_width == 0 || pixel_height == 0 {
                    return Err(Error::EncodeError("cannot place an empty image".into()));
                }
                let image_id = self.doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(pixel_width),
                        "Height" => i64::from(pixel_height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8i64,
                        "Filter" => "DCTDecode",
                    },
                    jpeg,
                ));
                let page_height = self.page_height;
                let page = self.current.get_or_insert_with(PageBuilder::default);
                let name = format!("Im{}", page.images.len());
                page.operations.extend(draw_image(&name, &placement, page_height));
                page.images.push((name, image_id));
            }
        }
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        let Some(page) = self.current.take() else {
            return Ok(());
        };
        let content = Content { operations: page.operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let mut xobjects = lopdf::Dictionary::new();
        for (name, id) in page.images {
            xobjects.set(name, id);
        }
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(self.page_width as f32), Object::Real(self.page_height as f32)],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.pages.push(page_id);
        Ok(())
    }

    /// Close the last page and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.finish_page()?;
        let kids: Vec<Object> = self.pages.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

/// A PDF text string (UTF-16BE with byte order mark)
fn text_string(s: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}

/// `cm` + `Do` for an image placed with a top-left origin in nominal pixels
fn draw_image(name: &str, placement: &Placement, page_height: f64) -> Vec<Operation> {
    let w = placement.width * PT_PER_PX;
    let h = placement.height * PT_PER_PX;
    let x = placement.x * PT_PER_PX;
    let y = page_height - placement.y * PT_PER_PX - h;
    let real = |v: f64| Object::Real(v as f32);
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", vec![real(w), real(0.0), real(0.0), real(h), real(x), real(y)]),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::raster::encode_jpeg;

    fn jpeg() -> Vec<u8> {
        encode_jpeg(&image::RgbImage::from_pixel(4, 2, image::Rgb([1, 2, 3])), 90).unwrap()
    }

    fn image_cmd(y: f64) -> PaintCommand {
        PaintCommand::Image {
            placement: Placement { x: 0.0, y, width: 794.0, height: 100.0 },
            pixel_width: 4,
            pixel_height: 2,
            jpeg: jpeg(),
        }
    }

    #[test]
    fn writes_one_page_per_new_page_command() {
        let mut enc = PdfEncoder::new(&PageGeometry::default(), "Title");
        enc.paint(image_cmd(72.0)).unwrap();
        enc.paint(PaintCommand::NewPage).unwrap();
        enc.paint(image_cmd(72.0)).unwrap();
        assert_eq!(enc.page_count(), 2);
        let bytes = enc.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn converts_top_left_placement_to_pdf_space() {
        let ops = draw_image("Im0", &Placement { x: 0.0, y: 72.0, width: 794.0, height: 100.0 }, 842.25);
        let cm = &ops[1];
        assert_eq!(cm.operator, "cm");
        // y = 842.25 - 54 - 75
        assert!((cm.operands[5].as_float().unwrap() - 713.25).abs() < 1e-3);
        assert!((cm.operands[0].as_float().unwrap() - 595.5).abs() < 1e-3);
    }

    #[test]
    fn rejects_empty_images() {
        let mut enc = PdfEncoder::new(&PageGeometry::default(), "T");
        let err = enc
            .paint(PaintCommand::Image {
                placement: Placement { x: 0.0, y: 0.0, width: 1.0, height: 1.0 },
                pixel_width: 0,
                pixel_height: 0,
                jpeg: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, Error::EncodeError(_)));
    }
}
