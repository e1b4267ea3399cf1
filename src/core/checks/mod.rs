// src/core/checks/mod.rs

//! The check battery run against one fetched page.
//!
//! Checks come in two shapes. [`CheckPredicate`]s are synchronous and look at
//! the response that was already fetched; [`AsyncProbe`]s may go back to the
//! network. [`CheckRunner`] isolates every predicate, races the probe batch
//! against a deadline and returns one severity-sorted list.

pub mod email_dns;
pub mod fingerprint;
pub mod headers;
pub mod tls;

use crate::core::models::{Finding, ResponseHeaders, sort_by_severity};
use async_trait::async_trait;
use futures::future::join_all;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A synchronous rule over a fetched response.
pub trait CheckPredicate: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn check(&self, url: &str, headers: &ResponseHeaders, body: &str) -> Option<Finding>;
}

impl<F> CheckPredicate for F
where
    F: Fn(&str, &ResponseHeaders, &str) -> Option<Finding> + Send + Sync,
{
    fn check(&self, url: &str, headers: &ResponseHeaders, body: &str) -> Option<Finding> {
        self(url, headers, body)
    }
}

/// A check that performs its own network I/O against the target.
#[async_trait]
pub trait AsyncProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self, url: &str) -> Result<Vec<Finding>, String>;
}

pub struct CheckRunner {
    predicates: Vec<Arc<dyn CheckPredicate>>,
    probes: Vec<Arc<dyn AsyncProbe>>,
    max_body_chars: usize,
    probe_deadline: Duration,
}

impl CheckRunner {
    pub fn new(max_body_chars: usize, probe_deadline: Duration) -> Self {
        Self {
            predicates: Vec::new(),
            probes: Vec::new(),
            max_body_chars,
            probe_deadline,
        }
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn CheckPredicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn AsyncProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Runs every predicate and probe against one response.
    pub async fn run(&self, url: &str, headers: &ResponseHeaders, body: &str) -> Vec<Finding> {
        let mut findings = self.run_predicates(url, headers, body);
        let probe_findings = self.run_probes(url).await;
        findings.extend(probe_findings);
        sort_by_severity(&mut findings);
        info!(url, findings = %findings.len(), "Check battery finished.");
        findings
    }

    fn run_predicates(&self, url: &str, headers: &ResponseHeaders, body: &str) -> Vec<Finding> {
        let body = truncate_chars(body, self.max_body_chars);
        let mut findings = Vec::new();

        for predicate in &self.predicates {
            let outcome = catch_unwind(AssertUnwindSafe(|| predicate.check(url, headers, body)));
            match outcome {
                Ok(Some(finding)) => {
                    debug!(check = predicate.name(), id = %finding.id, "Check produced a finding.");
                    findings.push(finding);
                }
                Ok(None) => {}
                Err(_) => {
                    warn!(check = predicate.name(), url, "Check panicked, skipping it.");
                }
            }
        }

        findings
    }

    async fn run_probes(&self, url: &str) -> Vec<Finding> {
        if self.probes.is_empty() {
            return Vec::new();
        }

        let batch = join_all(self.probes.iter().map(|probe| async move {
            match probe.probe(url).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(probe = probe.name(), url, error = %e, "Probe failed.");
                    Vec::new()
                }
            }
        }));

        match tokio::time::timeout(self.probe_deadline, batch).await {
            Ok(results) => results.into_iter().flatten().collect(),
            Err(_) => {
                warn!(url, deadline_ms = %self.probe_deadline.as_millis(), "Probe batch hit its deadline, dropping probe results.");
                Vec::new()
            }
        }
    }
}

/// Longest prefix of `s` with at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Severity, SeveritySummary};

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding::new(id, id, severity, "test")
    }

    struct FixedProbe {
        findings: Vec<Finding>,
        delay: Duration,
    }

    #[async_trait]
    impl AsyncProbe for FixedProbe {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn probe(&self, _url: &str) -> Result<Vec<Finding>, String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.findings.clone())
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl AsyncProbe for FailingProbe {
        fn name(&self) -> &str {
            "failing"
        }

        async fn probe(&self, _url: &str) -> Result<Vec<Finding>, String> {
            Err("boom".to_string())
        }
    }

    fn runner() -> CheckRunner {
        CheckRunner::new(1_000, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn results_are_sorted_even_when_fed_in_reverse() {
        let mut runner = runner();
        for severity in [Severity::Info, Severity::Low, Severity::Medium, Severity::High] {
            let id = severity.to_string();
            runner = runner.with_predicate(Arc::new(move |_: &str, _: &ResponseHeaders, _: &str| -> Option<Finding> {
                Some(finding(&id, severity))
            }));
        }
        runner = runner.with_probe(Arc::new(FixedProbe {
            findings: vec![finding("crit", Severity::Critical)],
            delay: Duration::ZERO,
        }));

        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "").await;
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info]
        );
    }

    #[tokio::test]
    async fn panicking_check_does_not_affect_siblings() {
        let runner = runner()
            .with_predicate(Arc::new(|_: &str, _: &ResponseHeaders, _: &str| -> Option<Finding> {
                panic!("bad rule")
            }))
            .with_predicate(Arc::new(|_: &str, _: &ResponseHeaders, _: &str| -> Option<Finding> {
                Some(finding("ok", Severity::Low))
            }));

        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "").await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "ok");
    }

    #[tokio::test]
    async fn predicates_see_truncated_body() {
        let runner = CheckRunner::new(5, Duration::from_millis(50)).with_predicate(Arc::new(
            |_: &str, _: &ResponseHeaders, body: &str| -> Option<Finding> {
                Some(Finding::new("len", body.to_string(), Severity::Info, "test"))
            },
        ));
        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "ééééééééé").await;
        assert_eq!(findings[0].title, "ééééé");
    }

    #[tokio::test]
    async fn slow_probe_batch_yields_nothing() {
        let runner = runner().with_probe(Arc::new(FixedProbe {
            findings: vec![finding("late", Severity::High)],
            delay: Duration::from_secs(5),
        }));
        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "").await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn failing_probe_is_not_fatal() {
        let runner = runner()
            .with_probe(Arc::new(FailingProbe))
            .with_probe(Arc::new(FixedProbe {
                findings: vec![finding("still-here", Severity::Medium)],
                delay: Duration::ZERO,
            }));
        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "").await;
        assert_eq!(findings.len(), 1);
    }

    #[tokio::test]
    async fn single_high_probe_finding_summarizes() {
        let runner = runner()
            .with_predicate(Arc::new(|_: &str, _: &ResponseHeaders, _: &str| -> Option<Finding> { None }))
            .with_predicate(Arc::new(|_: &str, _: &ResponseHeaders, _: &str| -> Option<Finding> { None }))
            .with_probe(Arc::new(FixedProbe {
                findings: vec![finding("probe-high", Severity::High)],
                delay: Duration::ZERO,
            }));
        let findings = runner.run("https://a.test/", &ResponseHeaders::new(), "<html></html>").await;
        let summary = SeveritySummary::from_findings(&findings);
        assert_eq!(
            summary,
            SeveritySummary { critical: 0, high: 1, medium: 0, low: 0, info: 0, total: 1 }
        );
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 0), "");
    }
}
