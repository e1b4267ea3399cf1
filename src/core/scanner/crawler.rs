// src/core/scanner/crawler.rs

use tracing::info;

use crate::core::models::{CrawlResult, Finding, PageScanResult, SeveritySummary, sort_by_severity};
use crate::core::scanner::link_discoverer::LinkDiscoverer;
use crate::core::scanner::page_scanner::{PageScanner, elapsed_ms};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Discovers pages once, then scans them one after another.
pub struct Crawler {
    discoverer: LinkDiscoverer,
    scanner: Arc<PageScanner>,
}

impl Crawler {
    pub fn new(discoverer: LinkDiscoverer, scanner: Arc<PageScanner>) -> Self {
        Self { discoverer, scanner }
    }

    pub async fn crawl(&self, entry_url: &str) -> CrawlResult {
        let started_at = Utc::now();
        let started = Instant::now();

        let pages = self.discoverer.discover(entry_url).await;
        info!(url = entry_url, pages = pages.len(), "Scanning discovered pages.");

        // Sequential on purpose: one page's fetch and checks finish before the
        // next request goes out.
        let mut pages_scanned = Vec::with_capacity(pages.len());
        for page in &pages {
            pages_scanned.push(self.scanner.scan(page).await);
        }

        let merged_findings = merge_findings(&pages_scanned);
        let merged_summary = SeveritySummary::from_findings(&merged_findings);
        info!(
            url = entry_url,
            pages = pages_scanned.len(),
            findings = %merged_summary.total,
            "Crawl finished."
        );

        CrawlResult {
            entry_url: entry_url.to_string(),
            started_at,
            pages_discovered: pages.len(),
            pages_scanned,
            merged_findings,
            merged_summary,
            duration: elapsed_ms(started),
        }
    }
}

/// Findings across pages, one per id. The first occurrence (in page order)
/// wins; the result is severity-sorted.
pub fn merge_findings(pages: &[PageScanResult]) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Finding> = pages
        .iter()
        .flat_map(|page| page.findings.iter())
        .filter(|f| seen.insert(f.id.clone()))
        .cloned()
        .collect();
    sort_by_severity(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ResponseHeaders, Severity};

    fn page(url: &str, findings: Vec<Finding>) -> PageScanResult {
        PageScanResult {
            url: url.to_string(),
            summary: SeveritySummary::from_findings(&findings),
            findings,
            duration: 1,
            response_headers: ResponseHeaders::new(),
        }
    }

    #[test]
    fn shared_ids_appear_once_first_wins() {
        let a = page(
            "https://a.test/",
            vec![
                Finding::new("CSP", "csp", Severity::Medium, "headers").with_evidence("first"),
                Finding::new("INFO", "info", Severity::Info, "x"),
            ],
        );
        let b = page(
            "https://a.test/b",
            vec![
                Finding::new("CSP", "csp", Severity::Medium, "headers").with_evidence("second"),
                Finding::new("CRIT", "crit", Severity::Critical, "x"),
            ],
        );
        let merged = merge_findings(&[a, b]);
        let ids: Vec<&str> = merged.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["CRIT", "CSP", "INFO"]);
        assert_eq!(merged[1].evidence.as_deref(), Some("first"));
    }

    #[test]
    fn no_pages_merge_to_nothing() {
        assert!(merge_findings(&[]).is_empty());
    }
}
