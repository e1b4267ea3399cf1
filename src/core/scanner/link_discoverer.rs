// src/core/scanner/link_discoverer.rs

use tracing::{debug, info, warn};

use crate::core::body::read_bounded;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::{Origin, Url};

static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap());

const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:"];

/// Extensions of resources that are never pages.
const ASSET_EXTENSIONS: &[&str] = &[
    // images
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".bmp", ".avif",
    // fonts
    ".woff", ".woff2", ".ttf", ".otf", ".eot",
    // styles and scripts
    ".css", ".js", ".mjs", ".map",
    // archives
    ".zip", ".tar", ".gz", ".tgz", ".rar", ".7z",
    // media
    ".mp3", ".mp4", ".webm", ".ogg", ".wav", ".avi", ".mov",
    // documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
];

/// Breadth-first, same-origin page discovery bounded by a total page cap.
pub struct LinkDiscoverer {
    client: reqwest::Client,
    max_pages: usize,
    fetch_timeout: Duration,
    max_body_bytes: usize,
}

impl LinkDiscoverer {
    pub fn new(
        client: reqwest::Client,
        max_pages: usize,
        fetch_timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            client,
            max_pages,
            fetch_timeout,
            max_body_bytes,
        }
    }

    /// Returns at most `max_pages` URLs, the entry URL first. The entry URL is
    /// returned even when it cannot be fetched or links nowhere; every other
    /// URL is listed only once a fetch of it stayed on the entry's origin.
    pub async fn discover(&self, entry_url: &str) -> Vec<String> {
        let mut pages = vec![entry_url.to_string()];

        let start = match Url::parse(entry_url) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = entry_url, error = %e, "Entry URL does not parse, skipping discovery.");
                return pages;
            }
        };
        let origin = start.origin();

        let mut visited: HashSet<String> = HashSet::from([normalize(&start)]);
        let mut queue: VecDeque<String> = VecDeque::from([entry_url.to_string()]);
        let mut is_entry = true;

        info!(url = entry_url, max_pages = self.max_pages, "Starting link discovery.");

        while pages.len() < self.max_pages {
            let Some(current) = queue.pop_front() else {
                break;
            };
            let outcome = self.fetch(&current, &origin).await;
            if !std::mem::take(&mut is_entry) {
                if matches!(outcome, Fetched::Dropped) {
                    continue;
                }
                debug!(link = %current, "Discovered page.");
                pages.push(current);
            }

            if let Fetched::Html(page_url, body) = outcome {
                for link in extract_links(&body, &page_url, &origin) {
                    if visited.insert(link.clone()) {
                        queue.push_back(link);
                    }
                }
            }
        }

        info!(url = entry_url, pages = pages.len(), "Link discovery finished.");
        pages
    }

    async fn fetch(&self, url: &str, origin: &Origin) -> Fetched {
        let response = match self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "Fetch failed, dropping page.");
                return Fetched::Dropped;
            }
        };

        let final_url = response.url().clone();
        if final_url.origin() != *origin {
            debug!(url, final_url = %final_url, "Redirected off-site, dropping page.");
            return Fetched::Dropped;
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            })
            .unwrap_or(false);
        if !is_html {
            debug!(url, "Not an HTML response, skipping link extraction.");
            return Fetched::Opaque;
        }

        let body = read_bounded(response, self.max_body_bytes).await;
        Fetched::Html(final_url, body)
    }
}

/// What one discovery fetch yielded.
enum Fetched {
    /// Transport failure or an off-origin final URL.
    Dropped,
    /// Same-origin, but not HTML: listed, never parsed.
    Opaque,
    /// Final URL and bounded body.
    Html(Url, String),
}

/// Same-origin page links found in `body`, normalized, in document order.
/// Duplicates are left to the caller's visited set.
pub fn extract_links(body: &str, page_url: &Url, origin: &Origin) -> Vec<String> {
    RE_HREF
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            !SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s))
        })
        .filter_map(|href| page_url.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| url.origin() == *origin)
        .filter(|url| !is_asset(url))
        .map(|url| normalize(&url))
        .collect()
}

/// Origin + path + query; fragment and credentials dropped.
pub fn normalize(url: &Url) -> String {
    let mut normalized = format!("{}{}", url.origin().ascii_serialization(), url.path());
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized
}

fn is_asset(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://shop.test/catalog/index.html").unwrap()
    }

    #[test]
    fn resolves_relative_links_and_drops_fragments() {
        let body = r##"<a href="item?id=3#reviews">x</a> <a href='/about'>y</a> <a href="#top">z</a>"##;
        let links = extract_links(body, &page(), &page().origin());
        assert_eq!(
            links,
            vec![
                "https://shop.test/catalog/item?id=3",
                "https://shop.test/about",
                "https://shop.test/catalog/index.html",
            ]
        );
    }

    #[test]
    fn skips_schemes_assets_and_foreign_origins() {
        let body = r#"
            <a href="https://evil.test/page">cross</a>
            <a href="mailto:ops@shop.test">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="tel:+100">call</a>
            <a href="/img/logo.PNG">logo</a>
            <link href="/style.css">
            <a href="http://shop.test/plain">other scheme same host</a>
        "#;
        assert!(extract_links(body, &page(), &page().origin()).is_empty());
    }

    #[test]
    fn normalize_keeps_query_only() {
        let url = Url::parse("https://user:pw@shop.test:443/a/b?x=1#frag").unwrap();
        assert_eq!(normalize(&url), "https://shop.test/a/b?x=1");
    }
}
