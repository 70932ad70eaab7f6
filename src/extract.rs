//! Article extraction driven by a declarative selector rule table.
//!
//! Each metadata field owns an ordered list of `(selector, extractor)` rules.
//! Rules are tried in order and the first non-empty value wins, so supporting
//! a markup change on the site means adding a rule rather than another branch.

use crate::sanitize::{sanitize_body, CleanBody};
use crate::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// How a matched element is turned into a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extractor {
    /// Trimmed text content
    #[default]
    Text,
    /// Trimmed text content, only if it contains `needle`
    TextContaining { needle: String },
    /// Trimmed text content with a trailing site suffix removed
    DocumentTitle { strip_suffix: String },
}

/// A single `(selector, extractor)` rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub selector: String,
    #[serde(default)]
    pub extract: Extractor,
}

impl RuleSpec {
    pub fn text(selector: &str) -> Self {
        Self { selector: selector.to_string(), extract: Extractor::Text }
    }

    pub fn containing(selector: &str, needle: &str) -> Self {
        Self {
            selector: selector.to_string(),
            extract: Extractor::TextContaining { needle: needle.to_string() },
        }
    }
}

/// The complete rule table, serde-configurable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub title: Vec<RuleSpec>,
    pub course: Vec<RuleSpec>,
    pub publish_time: Vec<RuleSpec>,
    pub author: Vec<RuleSpec>,
    /// Candidate body containers, in priority order
    pub body: Vec<String>,
    /// Subtrees dropped from the body
    pub remove: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            title: vec![
                RuleSpec::text(".article-title"),
                RuleSpec {
                    selector: "title".into(),
                    extract: Extractor::DocumentTitle { strip_suffix: " - 得到APP".into() },
                },
            ],
            course: vec![
                RuleSpec::text(".course-title"),
                RuleSpec::text(".courseName"),
                RuleSpec::text("[class*=\"courseName\"]"),
            ],
            publish_time: vec![
                RuleSpec::text(".article-publish-time"),
                RuleSpec::text(".article-update-time"),
                RuleSpec::containing(".date", "202"),
                RuleSpec::containing("[class*=\"date\"]", "202"),
            ],
            author: vec![RuleSpec::text(".article-author"), RuleSpec::text(".author-name")],
            body: vec![".article-body".into(), "article".into()],
            remove: [
                "script",
                "style",
                "button",
                ".dd-audio",
                ".article-video",
                ".pageControl",
                ".article-settings",
                ".article-control",
                ".my-comment",
                ".message-list",
                ".comment-input-area",
                ".message-title",
                ".message-unfold",
                "[class*=\"comment\"]",
                "[class*=\"留言\"]",
                "[class*=\"audioPlayer\"]",
                "[class*=\"share\"]",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::ConfigError(format!("invalid selector {:?}: {:?}", selector, e)))
}

struct Rule {
    selector: Selector,
    extractor: Extractor,
}

impl Rule {
    fn compile(spec: &RuleSpec) -> Result<Self> {
        Ok(Self { selector: parse_selector(&spec.selector)?, extractor: spec.extract.clone() })
    }

    fn apply(&self, document: &Html) -> Option<String> {
        document.select(&self.selector).find_map(|el| {
            let text = element_text(el);
            let value = match &self.extractor {
                Extractor::Text => text,
                Extractor::TextContaining { needle } => {
                    if text.contains(needle.as_str()) {
                        text
                    } else {
                        return None;
                    }
                }
                Extractor::DocumentTitle { strip_suffix } => text
                    .strip_suffix(strip_suffix.as_str())
                    .map(|t| t.trim().to_string())
                    .unwrap_or(text),
            };
            (!value.is_empty()).then_some(value)
        })
    }
}

fn first_match(rules: &[Rule], document: &Html) -> Option<String> {
    rules.iter().find_map(|r| r.apply(document))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// A rule table with every selector parsed
pub struct CompiledRules {
    title: Vec<Rule>,
    course: Vec<Rule>,
    publish_time: Vec<Rule>,
    author: Vec<Rule>,
    body: Vec<Selector>,
    remove: Selector,
}

impl CompiledRules {
    pub fn compile(rules: &ExtractionRules) -> Result<Self> {
        let field = |specs: &[RuleSpec]| specs.iter().map(Rule::compile).collect::<Result<Vec<_>>>();
        let body = rules.body.iter().map(|s| parse_selector(s)).collect::<Result<Vec<_>>>()?;
        if body.is_empty() {
            return Err(Error::ConfigError("no body selectors configured".into()));
        }
        // an empty removal list must still parse; `template` never appears in a cleaned body
        let remove = if rules.remove.is_empty() {
            parse_selector("template")?
        } else {
            parse_selector(&rules.remove.join(", "))?
        };
        Ok(Self {
            title: field(&rules.title)?,
            course: field(&rules.course)?,
            publish_time: field(&rules.publish_time)?,
            author: field(&rules.author)?,
            body,
            remove,
        })
    }

    pub fn meta(&self, document: &Html) -> ArticleMeta {
        ArticleMeta {
            title: first_match(&self.title, document).unwrap_or_default(),
            course: first_match(&self.course, document),
            publish_time: first_match(&self.publish_time, document),
            author: first_match(&self.author, document),
        }
    }

    fn body<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.body.iter().find_map(|sel| {
            document.select(sel).find(|el| !element_text(*el).is_empty())
        })
    }

    /// Whether the page has finished rendering its article: a title, and a
    /// body with more than a few characters of text.
    pub fn is_ready(&self, document: &Html) -> bool {
        if first_match(&self.title, document).is_none() {
            return false;
        }
        self.body(document)
            .map(|b| element_text(b).chars().count() > 10)
            .unwrap_or(false)
    }

    pub fn extract(&self, document: &Html) -> Result<Article> {
        let meta = self.meta(document);
        if meta.title.is_empty() {
            return Err(Error::ExtractionError("Cannot read article title.".into()));
        }
        let body = self
            .body(document)
            .ok_or_else(|| Error::ExtractionError("Cannot find article body.".into()))?;
        let body = sanitize_body(body, &self.remove);
        log::debug!(
            "extracted '{}' ({} bytes of body, {} images)",
            meta.title,
            body.html.len(),
            body.images.len()
        );
        Ok(Article { meta, body })
    }
}

/// Metadata shown in the export header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleMeta {
    pub title: String,
    pub course: Option<String>,
    pub publish_time: Option<String>,
    pub author: Option<String>,
}

/// An extracted article ready for layout
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub meta: ArticleMeta,
    pub body: CleanBody,
}

/// Parse `html` and extract the article with the given rules.
pub fn extract_article(html: &str, rules: &ExtractionRules) -> Result<Article> {
    let document = Html::parse_document(html);
    CompiledRules::compile(rules)?.extract(&document)
}
