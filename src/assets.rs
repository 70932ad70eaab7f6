//! Best-effort image inlining.
//!
//! Article images are fetched concurrently and embedded as `data:` URIs so the
//! export document renders without network access. The whole stage is bounded
//! by one timeout; images that fail or arrive late keep their original URL.

use crate::extract::Article;
use crate::sanitize::escape_attr;
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Duration;

/// Settings for the image fetch stage
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub base_url: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

fn resolve(src: &str, base_url: Option<&str>) -> Result<url::Url> {
    match url::Url::parse(src) {
        Ok(u) => Ok(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base_url.ok_or_else(|| {
                Error::NetworkError(format!("relative image URL {} without a base URL", src))
            })?;
            url::Url::parse(base)
                .and_then(|b| b.join(src))
                .map_err(|e| Error::NetworkError(format!("cannot resolve {}: {}", src, e)))
        }
        Err(e) => Err(Error::NetworkError(format!("invalid image URL {}: {}", src, e))),
    }
}

/// `type/subtype` made only of token characters that are safe inside an attribute
fn is_plain_mime(mime: &str) -> bool {
    let token = |part: &str| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
    };
    match mime.split_once('/') {
        Some((kind, subtype)) => token(kind) && token(subtype),
        None => false,
    }
}

async fn fetch_data_uri(client: &reqwest::Client, src: &str, base_url: Option<&str>) -> Result<String> {
    let url = resolve(src, base_url)?;
    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::NetworkError(format!("GET {} failed: {}", url, e)))?;
    if !resp.status().is_success() {
        return Err(Error::NetworkError(format!("GET {} returned {}", url, resp.status())));
    }
    let header_mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/") && is_plain_mime(v));
    let body = resp
        .bytes()
        .await
        .map_err(|e| Error::NetworkError(format!("Failed to read {}: {}", url, e)))?;
    let mime = match header_mime {
        Some(m) => m,
        None => image::guess_format(&body)
            .map(|f| f.to_mime_type().to_string())
            .map_err(|_| Error::NetworkError(format!("{} is not an image", url)))?,
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&body);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

/// Fetch every image in `sources`, returning `src -> data URI` for those that
/// arrived before the deadline.
pub async fn fetch_images(sources: &[String], options: &FetchOptions) -> Result<HashMap<String, String>> {
    let mut fetched = HashMap::new();
    if sources.is_empty() {
        return Ok(fetched);
    }
    let client = reqwest::Client::builder()
        .user_agent(options.user_agent.clone())
        .timeout(options.timeout)
        .build()
        .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

    let base = options.base_url.as_deref();
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .map(|src| {
            let client = &client;
            async move { (src, fetch_data_uri(client, src, base).await) }
        })
        .collect();

    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(
                    "image fetch timed out after {:?}; {} image(s) left as links",
                    options.timeout,
                    sources.len() - fetched.len()
                );
                break;
            }
            next = pending.next() => match next {
                Some((src, Ok(uri))) => {
                    debug!("inlined {}", src);
                    fetched.insert(src.clone(), uri);
                }
                Some((src, Err(e))) => warn!("skipping image {}: {}", src, e),
                None => break,
            }
        }
    }
    Ok(fetched)
}

/// Substitute fetched images into the article body; returns how many were inlined.
pub fn apply_inlined(article: &mut Article, fetched: &HashMap<String, String>) -> usize {
    let mut count = 0;
    // body text escapes its quotes, so ` src="` only occurs in real attributes
    for (src, uri) in fetched {
        let needle = format!(" src=\"{}\"", escape_attr(src));
        if article.body.html.contains(&needle) {
            article.body.html = article
                .body
                .html
                .replace(&needle, &format!(" src=\"{}\"", escape_attr(uri)));
            count += 1;
        }
    }
    count
}

/// Blocking wrapper: fetch and inline the article's images on a private runtime.
pub fn inline_images(article: &mut Article, options: &FetchOptions) -> Result<usize> {
    if article.body.images.is_empty() {
        return Ok(0);
    }
    let sources = &article.body.images;
    let run = || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Other(format!("Failed to start image fetch runtime: {}", e)))?;
        runtime.block_on(fetch_images(sources, options))
    };
    // a runtime cannot be started from a thread that already drives one
    let fetched = if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::scope(|scope| scope.spawn(run).join())
            .map_err(|_| Error::Other("image fetch thread panicked".into()))??
    } else {
        run()?
    };
    Ok(apply_inlined(article, &fetched))
}
