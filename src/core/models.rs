// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// Response headers flattened to lowercase name -> value.
pub type ResponseHeaders = BTreeMap<String, String>;

// --- Core Data Models ---

/// Risk level of a finding. Variant order is the sort order: `Critical`
/// sorts first, `Info` last.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Position in the risk ordering, 0 being the most severe.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// A single detected issue. `id` is the cross-page dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            severity,
            category: category.into(),
            remediation: String::new(),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Sorts findings by severity, most severe first. The sort is stable, so
/// findings of equal severity keep their relative order.
pub fn sort_by_severity(findings: &mut [Finding]) {
    findings.sort_by_key(|f| f.severity);
}

/// Count of findings per severity plus the total.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            *summary.slot(finding.severity) += 1;
            summary.total += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Info => &mut self.info,
        }
    }

    /// Iterates `(severity, count)` pairs from most to least severe.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        Severity::iter().map(move |s| (s, self.count(s)))
    }
}

// --- Page Scan Models ---

/// Outcome of fetching and checking one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageScanResult {
    pub url: String,
    pub findings: Vec<Finding>,
    pub summary: SeveritySummary,
    /// Milliseconds.
    pub duration: u64,
    pub response_headers: ResponseHeaders,
}

impl PageScanResult {
    /// Result for a page that could not be fetched: no findings, zero
    /// summary, only the time spent trying.
    pub fn failed(url: impl Into<String>, duration: u64) -> Self {
        Self {
            url: url.into(),
            findings: Vec::new(),
            summary: SeveritySummary::default(),
            duration,
            response_headers: ResponseHeaders::new(),
        }
    }
}

// --- Crawl Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub entry_url: String,
    pub started_at: DateTime<Utc>,
    pub pages_discovered: usize,
    pub pages_scanned: Vec<PageScanResult>,
    pub merged_findings: Vec<Finding>,
    pub merged_summary: SeveritySummary,
    /// Milliseconds for discovery plus every page scan.
    pub duration: u64,
}

impl CrawlResult {
    /// Per-page view used by the crawl response.
    pub fn page_breakdown(&self) -> Vec<PageBreakdown> {
        self.pages_scanned
            .iter()
            .map(|page| PageBreakdown {
                url: page.url.clone(),
                findings: page.findings.clone(),
                findings_count: page.findings.len(),
                summary: page.summary,
                duration: page.duration,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBreakdown {
    pub url: String,
    pub findings: Vec<Finding>,
    pub findings_count: usize,
    pub summary: SeveritySummary,
    pub duration: u64,
}

// --- Subdomain Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSubdomain {
    pub subdomain: String,
    pub url: String,
    pub reachable: bool,
    pub status_code: Option<u16>,
    /// Every path that independently reported this host.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdomainReport {
    pub domain: String,
    pub total: usize,
    pub reachable: usize,
    pub subdomains: Vec<DiscoveredSubdomain>,
    pub sources: BTreeMap<String, usize>,
}

// --- Request / Response Shapes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub findings: Vec<Finding>,
    pub summary: SeveritySummary,
    pub duration: u64,
    pub response_headers: ResponseHeaders,
}

impl From<PageScanResult> for ScanResponse {
    fn from(page: PageScanResult) -> Self {
        Self {
            findings: page.findings,
            summary: page.summary,
            duration: page.duration,
            response_headers: page.response_headers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSection {
    pub pages_discovered: usize,
    pub pages_scanned: usize,
    pub pages: Vec<PageBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResponse {
    pub findings: Vec<Finding>,
    pub summary: SeveritySummary,
    pub duration: u64,
    /// Headers of the entry page, when it was fetched.
    pub response_headers: ResponseHeaders,
    pub crawl: CrawlSection,
}

impl From<CrawlResult> for CrawlResponse {
    fn from(result: CrawlResult) -> Self {
        let pages = result.page_breakdown();
        let response_headers = result
            .pages_scanned
            .first()
            .map(|p| p.response_headers.clone())
            .unwrap_or_default();
        Self {
            crawl: CrawlSection {
                pages_discovered: result.pages_discovered,
                pages_scanned: result.pages_scanned.len(),
                pages,
            },
            findings: result.merged_findings,
            summary: result.merged_summary,
            duration: result.duration,
            response_headers,
        }
    }
}
