//! Print-ready HTML document for the browser-print capture strategy.
//!
//! The output is a standalone page styled for `@media print` (A4, 2cm margins)
//! with a screen preview. Opening it in a browser and printing to PDF gives the
//! exported document.

use crate::extract::Article;
use crate::sanitize::escape_text;
use crate::{Error, Result};

/// Bodies shorter than this are treated as a failed extraction
const MIN_CONTENT_LEN: usize = 50;

const PRINT_CSS: &str = r#"
@media print {
  @page { size: A4; margin: 2cm; }
  body { font-family: 'Microsoft YaHei', 'PingFang SC', 'Hiragino Sans GB', Arial, sans-serif; font-size: 14px; line-height: 1.8; color: #333; }
  .header { text-align: center; margin-bottom: 30px; padding-bottom: 20px; border-bottom: 2px solid #667eea; }
  .header h1 { font-size: 24px; color: #667eea; margin: 0 0 10px 0; }
  .header .meta { font-size: 12px; color: #666; margin: 5px 0; }
  .content { font-size: 14px; line-height: 1.8; }
  .content p { margin: 12px 0; text-align: justify; }
  .content h2, .content h3 { margin-top: 20px; margin-bottom: 10px; color: #333; }
  .content img { max-width: 100%; height: auto; display: block; margin: 15px auto; }
  .footer { margin-top: 40px; padding-top: 15px; border-top: 1px solid #ddd; text-align: center; font-size: 10px; color: #999; }
  .print-hint { display: none; }
}
@media screen {
  body { max-width: 800px; margin: 0 auto; padding: 40px; font-family: 'Microsoft YaHei', 'PingFang SC', Arial, sans-serif; background: #f5f5f5; }
  .container { background: white; padding: 40px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
  .header { text-align: center; margin-bottom: 30px; padding-bottom: 20px; border-bottom: 2px solid #667eea; }
  .header h1 { font-size: 28px; color: #667eea; margin: 0 0 10px 0; }
  .header .meta { font-size: 14px; color: #666; margin: 5px 0; }
  .content { font-size: 16px; line-height: 1.8; color: #333; }
  .content p { margin: 15px 0; }
  .content img { max-width: 100%; height: auto; }
  .footer { margin-top: 40px; padding-top: 15px; border-top: 1px solid #ddd; text-align: center; font-size: 12px; color: #999; }
  .print-hint { position: fixed; top: 20px; left: 50%; transform: translateX(-50%); background: #667eea; color: white; padding: 15px 30px; border-radius: 8px; box-shadow: 0 4px 12px rgba(0,0,0,0.2); z-index: 9999; font-size: 14px; }
}
"#;

const HINT_SCRIPT: &str = "setTimeout(function(){var h=document.getElementById('printHint');if(h)h.style.display='none';},5000);";

const AUTO_PRINT_SCRIPT: &str = "window.addEventListener('load',function(){setTimeout(function(){window.print();},500);});";

/// Options for the print document
#[derive(Debug, Clone, Default)]
pub struct PrintOptions {
    /// Open the print dialog shortly after the page loads
    pub auto_print: bool,
}

/// Render the print document for `article`.
pub fn render_print_document(article: &Article, exported_at: &str, options: &PrintOptions) -> Result<String> {
    if article.body.html.chars().count() < MIN_CONTENT_LEN {
        return Err(Error::ExtractionError(
            "content extraction failed; reload the page and try again".into(),
        ));
    }

    let meta = &article.meta;
    let title = escape_text(&meta.title);
    let mut header_meta = String::new();
    for value in [&meta.course, &meta.publish_time].into_iter().flatten() {
        header_meta.push_str(&format!("<div class=\"meta\">{}</div>", escape_text(value)));
    }
    let mut scripts = String::from(HINT_SCRIPT);
    if options.auto_print {
        scripts.push_str(AUTO_PRINT_SCRIPT);
    }

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n\
         <div class=\"print-hint\" id=\"printHint\">预览窗口已打开，请按 Ctrl+P (Windows) 或 Cmd+P (Mac) 打印保存为PDF</div>\n\
         <div class=\"container\">\n<div class=\"header\">\n<h1>{title}</h1>\n{header_meta}\n</div>\n\
         <div class=\"content\">\n{content}\n</div>\n\
         <div class=\"footer\">\n<p>导出自: 得到APP</p>\n<p>导出时间: {exported_at}</p>\n</div>\n</div>\n\
         <script>{scripts}</script>\n</body>\n</html>\n",
        title = title,
        css = PRINT_CSS,
        header_meta = header_meta,
        content = article.body.html,
        exported_at = escape_text(exported_at),
        scripts = scripts,
    ))
}
