//! End-to-end exports with a prerendered capture

use chrono::{Local, TimeZone};
use image::{ImageFormat, Rgba, RgbaImage};
use rfexport::rendering::{PrerenderedRasterizer, Screenshot};
use rfexport::{paginate_to_pdf, CaptureStrategy, Error, ExportConfig, Exporter, PageGeometry};
use std::io::Cursor;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head><title>第7讲 边际效应 - 得到APP</title></head>
<body>
  <div class="course-title">经济学30讲</div>
  <div class="article-publish-time">2023-05-01</div>
  <div class="article-body">
    <p>边际效应说的是，每多投入一份资源，带来的额外回报会逐渐减少。</p>
    <div class="dd-audio">播放器</div>
    <p>This paragraph is long enough to make the print document worth exporting.</p>
  </div>
</body></html>"#;

/// A striped capture so every page slice has visible content
fn striped_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |_, y| {
        if (y / 40) % 2 == 0 {
            Rgba([20, 20, 20, 255])
        } else {
            Rgba([250, 250, 250, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

fn config(strategy: CaptureStrategy) -> ExportConfig {
    ExportConfig { strategy, inline_images: false, ..Default::default() }
}

fn raster_exporter(width: u32, height: u32) -> Exporter {
    let shot = Screenshot::from_bytes(striped_png(width, height)).expect("decode capture");
    Exporter::new(config(CaptureStrategy::Raster))
        .expect("exporter")
        .with_rasterizer(PrerenderedRasterizer::new(shot))
}

fn fixed_time() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).single().expect("unambiguous time")
}

#[test]
fn raster_export_page_count_matches_the_plan() {
    let out = raster_exporter(1588, 5000).export(ARTICLE).expect("export");
    // slice height 1910: 1910 + 1910 + 1180
    assert_eq!(out.page_count, Some(3));
    assert_eq!(out.filename, "第7讲 边际效应.pdf");

    let doc = lopdf::Document::load_mem(&out.bytes).expect("valid pdf");
    assert_eq!(doc.get_pages().len(), 3);
}

#[test]
fn pdf_pages_use_the_configured_page_size() {
    let geometry = PageGeometry { page_width: 600, page_height: 800, top_margin: 50, bottom_margin: 50 };
    let shot = Screenshot::from_bytes(striped_png(1200, 2000)).expect("decode capture");
    let (bytes, pages) = paginate_to_pdf(&shot, &geometry, 90, "custom").expect("pdf");
    // content 700 * 2 = 1400 rows per page
    assert_eq!(pages, 2);

    let doc = lopdf::Document::load_mem(&bytes).expect("valid pdf");
    for (_, page_id) in doc.get_pages() {
        let page = doc.get_dictionary(page_id).expect("page dict");
        let media_box = page.get(b"MediaBox").and_then(|o| o.as_array()).expect("media box");
        let width = media_box[2].as_float().expect("width");
        let height = media_box[3].as_float().expect("height");
        assert_eq!(width, 450.0);
        assert_eq!(height, 600.0);
    }
}

#[test]
fn raster_export_is_deterministic() {
    let a = raster_exporter(794, 2000).export_at(ARTICLE, fixed_time()).expect("export");
    let b = raster_exporter(794, 2000).export_at(ARTICLE, fixed_time()).expect("export");
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.digest().len(), 64);
}

#[test]
fn print_export_contains_header_and_cleaned_body() {
    let exporter = Exporter::new(config(CaptureStrategy::Print)).expect("exporter");
    let out = exporter.export_at(ARTICLE, fixed_time()).expect("export");
    assert_eq!(out.filename, "第7讲 边际效应.html");
    assert_eq!(out.mime_type, "text/html");

    let html = String::from_utf8(out.bytes).expect("utf-8");
    assert!(html.contains("<h1>第7讲 边际效应</h1>"));
    assert!(html.contains("经济学30讲"));
    assert!(html.contains("2024-03-09 08:30:00"));
    assert!(html.contains("边际效应说的是"));
    assert!(!html.contains("播放器"));
    assert!(!html.contains("window.print()"));
}

#[test]
fn auto_print_adds_the_print_call() {
    let cfg = ExportConfig { auto_print: true, ..config(CaptureStrategy::Print) };
    let out = Exporter::new(cfg).expect("exporter").export(ARTICLE).expect("export");
    assert!(String::from_utf8_lossy(&out.bytes).contains("window.print()"));
}

#[test]
fn save_in_writes_only_the_final_file() {
    let dir = std::env::temp_dir().join(format!("rfexport-save-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");

    let out = raster_exporter(794, 1200).export(ARTICLE).expect("export");
    let path = out.save_in(&dir).expect("save");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("第7讲 边际效应.pdf"));
    assert_eq!(std::fs::read(&path).expect("read back"), out.bytes);

    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .expect("list dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn save_in_missing_directory_fails_cleanly() {
    let out = raster_exporter(794, 500).export(ARTICLE).expect("export");
    let dir = std::env::temp_dir().join("rfexport-does-not-exist").join("nested");
    assert!(matches!(out.save_in(&dir), Err(Error::Io(_))));
    assert!(!dir.exists());
}

#[test]
fn page_without_article_is_an_extraction_error() {
    let exporter = raster_exporter(794, 500);
    let err = exporter.export("<html><body><p>nothing here</p></body></html>").unwrap_err();
    assert!(matches!(err, Error::ExtractionError(_)));
    assert!(!exporter.is_busy());
}
