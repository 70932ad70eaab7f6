//! Export document layout for the raster capture strategy
//!
//! The article is placed in a fixed-width root whose padding mirrors the page
//! margins, so that one page width of the capture corresponds to one PDF page.

use crate::extract::Article;
use crate::paginate::PageGeometry;
use crate::sanitize::escape_text;

pub const EXPORT_ROOT_ID: &str = "rfexport-root";

/// Side padding of the export root, in nominal pixels
const SIDE_PADDING: u32 = 48;

fn stylesheet(geometry: &PageGeometry) -> String {
    let w = geometry.page_width;
    let root = EXPORT_ROOT_ID;
    format!(
        r#"
html, body {{ margin: 0; padding: 0; background: #ffffff; zoom: 1; transform: none; }}
#{root} {{
  position: relative;
  width: {w}px; min-width: {w}px; max-width: {w}px;
  margin: 0;
  padding: {top}px {side}px {bottom}px;
  color: #121212; background: #fff;
  font-family: "Noto Serif SC", "Source Han Serif SC", "PingFang SC", "Microsoft YaHei", serif;
  line-height: 1.75; font-size: 15px;
  box-sizing: border-box; word-break: break-word;
}}
#{root}, #{root} * {{ content-visibility: visible !important; contain: none !important; box-sizing: border-box; max-width: 100%; }}
#{root} h1 {{ font-size: 26px; margin: 0 0 8px; line-height: 1.3; }}
#{root} h2, #{root} h3, #{root} h4 {{ margin: 18px 0 8px; line-height: 1.4; }}
#{root} h2 {{ font-size: 20px; }}
#{root} h3 {{ font-size: 18px; }}
#{root} h4 {{ font-size: 16px; }}
#{root} .rfexport-meta {{ margin: 8px 0 20px; font-size: 13px; color: #555; display: flex; flex-wrap: wrap; gap: 8px 16px; }}
#{root} .rfexport-meta span {{ white-space: nowrap; }}
#{root} .rfexport-divider {{ height: 1px; background: #e5e5e5; margin: 18px 0 24px; }}
#{root} .rfexport-content {{ width: 100% !important; max-width: none !important; overflow: visible !important; }}
#{root} img {{ max-width: 100%; height: auto; display: block; margin: 14px auto; }}
#{root} figure {{ margin: 16px 0; }}
#{root} figcaption {{ font-size: 12px; color: #666; text-align: center; margin-top: 6px; }}
#{root} blockquote {{ margin: 16px 0; padding: 12px 16px; background: #f7f7f7; border-left: 4px solid #d3d3d3; }}
#{root} p {{ margin: 10px 0; }}
#{root} ul, #{root} ol {{ padding-left: 20px; margin: 10px 0; }}
#{root} a {{ color: #111; text-decoration: none; }}
#{root} table {{ width: 100%; border-collapse: collapse; margin: 12px 0; }}
#{root} th, #{root} td {{ border: 1px solid #e5e5e5; padding: 6px 8px; }}
"#,
        root = root,
        w = w,
        top = geometry.top_margin,
        bottom = geometry.bottom_margin,
        side = SIDE_PADDING,
    )
}

/// Header meta items as (label, value) pairs, in display order
pub fn meta_items(article: &Article, exported_at: &str) -> Vec<(&'static str, String)> {
    let meta = &article.meta;
    let mut items = Vec::new();
    if let Some(course) = &meta.course {
        items.push(("课程", course.clone()));
    }
    if let Some(author) = &meta.author {
        items.push(("作者", author.clone()));
    }
    if let Some(time) = &meta.publish_time {
        items.push(("发布时间", time.clone()));
    }
    items.push(("导出时间", exported_at.to_string()));
    items
}

/// Build the complete export document handed to the rasterizer.
pub fn layout_document(article: &Article, geometry: &PageGeometry, exported_at: &str) -> String {
    let title = escape_text(&article.meta.title);
    let meta = meta_items(article, exported_at)
        .into_iter()
        .map(|(label, value)| format!("<span>{}: {}</span>", label, escape_text(&value)))
        .collect::<Vec<_>>()
        .join("");

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><title>{title}</title><style>{css}</style></head>\
         <body><div id=\"{root}\"><h1>{title}</h1><div class=\"rfexport-meta\">{meta}</div>\
         <div class=\"rfexport-divider\"></div><div class=\"rfexport-content\">{body}</div></div></body></html>",
        title = title,
        css = stylesheet(geometry),
        root = EXPORT_ROOT_ID,
        meta = meta,
        body = article.body.html,
    )
}
