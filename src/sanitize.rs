//! Article body cleanup.
//!
//! The article body is re-serialized from the parsed page rather than edited
//! in place: unwanted widgets are skipped, site-specific header blocks become
//! real headings, lazy-loaded images get a usable `src`, and only a small set
//! of presentational attributes survives.

use scraper::{ElementRef, Node, Selector};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const ALLOWED_STYLES: &[&str] = &["text-align", "font-weight", "font-style", "text-decoration"];

const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-original", "data-url"];

/// Sanitized article body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanBody {
    /// Serialized HTML of the cleaned body element
    pub html: String,
    /// Image sources referenced by the body, in document order
    pub images: Vec<String>,
}

/// Serialize `body` with everything matching `remove` dropped.
pub fn sanitize_body(body: ElementRef<'_>, remove: &Selector) -> CleanBody {
    let removed: Vec<ElementRef<'_>> = body.select(remove).collect();
    let mut out = CleanBody::default();
    write_element(body, &removed, &mut out);
    out
}

fn write_element<'a>(el: ElementRef<'a>, removed: &[ElementRef<'a>], out: &mut CleanBody) {
    let element = el.value();
    let promoted = header_level(el);
    let tag = match promoted {
        Some(level) => format!("h{}", level),
        None => element.name().to_string(),
    };

    // promoted headers are rebuilt without any of the block's attributes
    let mut attrs: Vec<(String, String)> = match promoted {
        Some(_) => Vec::new(),
        None => element
            .attrs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect(),
    };
    if tag == "img" {
        normalize_image(&mut attrs);
        if let Some((_, src)) = attrs.iter().find(|(k, _)| k == "src") {
            if !src.is_empty() && !src.starts_with("data:") && !out.images.contains(src) {
                out.images.push(src.clone());
            }
        }
    }
    // attribute maps are unordered; sort for stable output
    attrs.sort();

    out.html.push('<');
    out.html.push_str(&tag);
    for (name, value) in attrs {
        let value = if name == "style" {
            match filter_style(&value) {
                Some(style) => style,
                None => continue,
            }
        } else if is_stripped_attr(&name) {
            continue;
        } else {
            value
        };
        out.html.push(' ');
        out.html.push_str(&name);
        out.html.push_str("=\"");
        out.html.push_str(&escape_attr(&value));
        out.html.push('"');
    }
    out.html.push('>');

    if VOID_ELEMENTS.contains(&tag.as_str()) {
        return;
    }

    for child in el.children() {
        match child.value() {
            // quotes are escaped too, so body text never reads as an attribute
            Node::Text(text) => out.html.push_str(&escape_attr(text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !removed.contains(&child_el) {
                        write_element(child_el, removed, out);
                    }
                }
            }
            _ => {}
        }
    }

    out.html.push_str("</");
    out.html.push_str(&tag);
    out.html.push('>');
}

/// Heading level for `.article-header` blocks: `header-N` maps to `hN+1`,
/// clamped to h2..=h6.
fn header_level(el: ElementRef<'_>) -> Option<u8> {
    let classes: Vec<&str> = el.value().classes().collect();
    if !classes.contains(&"article-header") {
        return None;
    }
    let mut level = 2i64;
    for class in classes {
        if let Some(n) = class.strip_prefix("header-").and_then(|n| n.parse::<i64>().ok()) {
            level = n.saturating_add(1).clamp(2, 6);
        }
    }
    // clamped to 2..=6 above
    Some(level as u8)
}

fn normalize_image(attrs: &mut Vec<(String, String)>) {
    let lazy = LAZY_SRC_ATTRS.iter().find_map(|name| {
        attrs
            .iter()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.clone())
    });
    if let Some(lazy) = lazy {
        match attrs.iter_mut().find(|(k, _)| k == "src") {
            Some((_, src)) if src.is_empty() || src.starts_with("data:") => *src = lazy,
            Some(_) => {}
            None => attrs.push(("src".into(), lazy)),
        }
    }
    for (name, value) in [("loading", "eager"), ("decoding", "sync"), ("crossorigin", "anonymous")] {
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }
}

fn is_stripped_attr(name: &str) -> bool {
    name == "class" || name.starts_with("data-") || name.starts_with("aria-") || name.starts_with("on")
}

/// Keep only whitelisted declarations; `None` when nothing survives.
fn filter_style(style: &str) -> Option<String> {
    let kept: Vec<String> = style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let (prop, value) = (prop.trim(), value.trim());
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            ALLOWED_STYLES
                .contains(&prop.to_ascii_lowercase().as_str())
                .then(|| format!("{}: {}", prop, value))
        })
        .collect();
    (!kept.is_empty()).then(|| kept.join("; "))
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
