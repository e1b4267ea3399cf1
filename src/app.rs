// src/app.rs

use crate::config::ReconConfig;
use crate::core::checks::email_dns::EmailAuthProbe;
use crate::core::checks::fingerprint::GeneratorVersionCheck;
use crate::core::checks::headers::default_header_checks;
use crate::core::checks::tls::TlsCertificateProbe;
use crate::core::checks::CheckRunner;
use crate::core::errors::{ReconError, ReconResult};
use crate::core::models::{CrawlResponse, ScanRequest, ScanResponse, SubdomainReport};
use crate::core::quota::{InMemoryQuota, QuotaGate};
use crate::core::recon::SubdomainRecon;
use crate::core::recon::dns_gate::HickoryResolver;
use crate::core::recon::prober::HttpProber;
use crate::core::recon::sources::default_sources;
use crate::core::scanner::build_client;
use crate::core::scanner::crawler::Crawler;
use crate::core::scanner::link_discoverer::LinkDiscoverer;
use crate::core::scanner::page_scanner::PageScanner;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// The three operations exposed to callers. Each one validates its target,
/// charges the caller's quota and only then touches the network.
pub struct App {
    config: ReconConfig,
    quota: Arc<dyn QuotaGate>,
    page_scanner: Arc<PageScanner>,
    crawler: Crawler,
    recon: SubdomainRecon,
}

impl App {
    pub fn new(
        config: ReconConfig,
        quota: Arc<dyn QuotaGate>,
        page_scanner: Arc<PageScanner>,
        crawler: Crawler,
        recon: SubdomainRecon,
    ) -> Self {
        Self {
            config,
            quota,
            page_scanner,
            crawler,
            recon,
        }
    }

    /// Wires the default check battery, OSINT sources, system resolver and an
    /// in-memory quota.
    pub fn from_config(config: ReconConfig) -> ReconResult<Self> {
        config.validate()?;
        let client = build_client(&config.user_agent, config.scan.max_redirects)?;

        let page_scanner = Arc::new(PageScanner::new(
            client.clone(),
            default_runner(&config),
            config.scan.fetch_timeout(),
            config.scan.max_body_bytes,
        ));

        let crawl_scanner = Arc::new(PageScanner::new(
            client.clone(),
            default_runner(&config),
            config.crawl.fetch_timeout(),
            config.crawl.max_body_bytes,
        ));
        let discoverer = LinkDiscoverer::new(
            client.clone(),
            config.crawl.max_pages,
            config.crawl.fetch_timeout(),
            config.crawl.max_body_bytes,
        );
        let crawler = Crawler::new(discoverer, crawl_scanner);

        let subdomains = &config.subdomains;
        let recon = SubdomainRecon::new(
            default_sources(client.clone(), subdomains.source_limits()),
            Arc::new(HickoryResolver::new()),
            Arc::new(HttpProber::new(
                client,
                subdomains.https_timeout(),
                subdomains.http_timeout(),
            )),
            subdomains.clone(),
        );

        Ok(Self::new(
            config,
            Arc::new(InMemoryQuota::new()),
            page_scanner,
            crawler,
            recon,
        ))
    }

    /// Single-page scan. The only operation that reports an unreachable target
    /// as an error.
    pub async fn scan_page(&self, key: &str, request: ScanRequest) -> ReconResult<ScanResponse> {
        let url = normalize_target(&request.url)?;
        self.admit(key).await?;
        let result = self.page_scanner.try_scan(&url).await?;
        Ok(result.into())
    }

    pub async fn crawl(&self, key: &str, request: ScanRequest) -> ReconResult<CrawlResponse> {
        let url = normalize_target(&request.url)?;
        self.admit(key).await?;
        Ok(self.crawler.crawl(&url).await.into())
    }

    pub async fn discover_subdomains(
        &self,
        key: &str,
        request: ScanRequest,
    ) -> ReconResult<SubdomainReport> {
        let url = normalize_target(&request.url)?;
        self.admit(key).await?;
        self.recon.discover(&url).await
    }

    async fn admit(&self, key: &str) -> ReconResult<()> {
        let decision = self.quota.check(key, &self.config.quota).await;
        if !decision.allowed {
            warn!(key, resets_at = %decision.resets_at, "Request rejected by quota.");
            return Err(ReconError::QuotaExceeded {
                limit: decision.limit,
                resets_at: decision.resets_at,
            });
        }
        info!(key, remaining = decision.remaining, "Request admitted.");
        Ok(())
    }
}

fn default_runner(config: &ReconConfig) -> CheckRunner {
    let runner = default_header_checks().into_iter().fold(
        CheckRunner::new(config.scan.max_check_body_chars, config.scan.probe_deadline()),
        |runner, check| runner.with_predicate(check),
    );
    let runner = runner
        .with_predicate(Arc::new(GeneratorVersionCheck))
        .with_probe(Arc::new(TlsCertificateProbe::new(config.subdomains.https_timeout())))
        .with_probe(Arc::new(EmailAuthProbe::new()));
    debug!(
        predicates = runner.predicate_count(),
        probes = runner.probe_count(),
        "Check battery assembled."
    );
    runner
}

/// Adds `https://` to bare hosts and rejects anything that is not an http(s)
/// URL with a host.
pub fn normalize_target(raw: &str) -> ReconResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ReconError::InvalidTarget("empty target".into()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ReconError::InvalidTarget(format!("'{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReconError::InvalidTarget(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ReconError::InvalidTarget(format!("'{trimmed}' has no host")));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_get_https() {
        assert_eq!(normalize_target("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            normalize_target(" http://example.com/a?b=1 ").unwrap(),
            "http://example.com/a?b=1"
        );
    }

    #[test]
    fn non_http_targets_are_rejected() {
        assert!(matches!(normalize_target("ftp://example.com"), Err(ReconError::InvalidTarget(_))));
        assert!(matches!(normalize_target(""), Err(ReconError::InvalidTarget(_))));
        assert!(matches!(normalize_target("https://"), Err(ReconError::InvalidTarget(_))));
    }
}
