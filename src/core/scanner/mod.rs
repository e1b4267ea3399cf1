// src/core/scanner/mod.rs

// Page-level scanning: fetching one URL and checking it, discovering
// same-origin pages, and crawling a site page by page.
pub mod crawler;
pub mod link_discoverer;
pub mod page_scanner;

use crate::core::errors::ReconResult;
use reqwest::redirect::Policy;
use tracing::error;

/// Builds the HTTP client used against target sites: fixed user agent,
/// redirects followed up to `max_redirects`. Per-request timeouts are set at
/// each call site.
pub fn build_client(user_agent: &str, max_redirects: usize) -> ReconResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(max_redirects))
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to build HTTP client.");
            e.into()
        })
}
