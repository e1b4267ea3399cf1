// src/core/scanner/page_scanner.rs

use tracing::{debug, info, warn};

use crate::core::body::read_bounded;
use crate::core::checks::CheckRunner;
use crate::core::errors::{ReconError, ReconResult};
use crate::core::models::{PageScanResult, ResponseHeaders, SeveritySummary};
use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};

/// Fetches one URL and runs the check battery on the response.
pub struct PageScanner {
    client: reqwest::Client,
    runner: CheckRunner,
    fetch_timeout: Duration,
    max_body_bytes: usize,
}

impl PageScanner {
    pub fn new(
        client: reqwest::Client,
        runner: CheckRunner,
        fetch_timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            client,
            runner,
            fetch_timeout,
            max_body_bytes,
        }
    }

    /// Scans `url`, failing open: an unreachable page yields an empty result
    /// tagged only with the time spent.
    pub async fn scan(&self, url: &str) -> PageScanResult {
        let started = Instant::now();
        match self.try_scan(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url, error = %e, "Page scan failed, returning empty result.");
                PageScanResult::failed(url, elapsed_ms(started))
            }
        }
    }

    /// Scans `url`, reporting a failed fetch as `TargetUnreachable`.
    pub async fn try_scan(&self, url: &str) -> ReconResult<PageScanResult> {
        let started = Instant::now();
        info!(url, "Starting page scan.");

        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| ReconError::TargetUnreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(url, status = %response.status(), final_url = %response.url(), "Received response.");
        let response_headers = flatten_headers(response.headers());
        let body = read_bounded(response, self.max_body_bytes).await;

        let findings = self.runner.run(url, &response_headers, &body).await;
        let summary = SeveritySummary::from_findings(&findings);
        let duration = elapsed_ms(started);
        info!(url, findings = %summary.total, duration_ms = duration, "Page scan finished.");

        Ok(PageScanResult {
            url: url.to_string(),
            findings,
            summary,
            duration,
            response_headers,
        })
    }
}

/// Lowercase name -> value. Repeated `Set-Cookie` headers are joined with a
/// newline, other repeated headers with ", ". Non-UTF-8 values are replaced
/// by a placeholder.
pub fn flatten_headers(headers: &HeaderMap) -> ResponseHeaders {
    let mut flat = ResponseHeaders::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("[Invalid UTF-8]").to_string();
        let separator = if *name == reqwest::header::SET_COOKIE { "\n" } else { ", " };
        flat.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(separator);
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE, VARY};

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(VARY, HeaderValue::from_static("accept"));
        headers.append(VARY, HeaderValue::from_static("origin"));
        let flat = flatten_headers(&headers);
        assert_eq!(flat["set-cookie"], "a=1\nb=2");
        assert_eq!(flat["vary"], "accept, origin");
    }
}
