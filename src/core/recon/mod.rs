// src/core/recon/mod.rs

//! Subdomain reconnaissance: passive OSINT sources plus a small brute-force
//! dictionary, both verified through the same DNS gate and HTTP probe.

pub mod dns_gate;
pub mod domain;
pub mod prober;
pub mod sources;

use crate::config::SubdomainConfig;
use crate::core::errors::{ReconError, ReconResult};
use crate::core::models::{DiscoveredSubdomain, SubdomainReport};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use self::dns_gate::{HostResolver, dns_gate};
use self::domain::{extract_root_domain, host_of, normalize_candidate};
use self::prober::{ReachabilityProber, probe_all};
use self::sources::SubdomainSource;

pub const BRUTE_FORCE_SOURCE: &str = "brute-force";

/// Prefixes tried under the root domain.
pub const BRUTE_FORCE_PREFIXES: &[&str] = &[
    "www", "mail", "webmail", "smtp", "imap", "pop", "mx", "ns1", "ns2", "dns",
    "api", "app", "apps", "dev", "staging", "stage", "test", "qa", "uat", "beta",
    "demo", "sandbox", "admin", "portal", "dashboard", "panel", "cpanel", "login", "auth", "sso",
    "vpn", "remote", "gateway", "proxy", "cdn", "static", "assets", "img", "media", "files",
    "docs", "blog", "shop", "store", "support", "help", "status", "git", "jenkins", "monitor",
];

/// Provenance: subdomain -> names of the paths that reported it.
type Provenance = BTreeMap<String, Vec<String>>;

pub struct SubdomainRecon {
    sources: Vec<Arc<dyn SubdomainSource>>,
    resolver: Arc<dyn HostResolver>,
    prober: Arc<dyn ReachabilityProber>,
    config: SubdomainConfig,
}

impl SubdomainRecon {
    pub fn new(
        sources: Vec<Arc<dyn SubdomainSource>>,
        resolver: Arc<dyn HostResolver>,
        prober: Arc<dyn ReachabilityProber>,
        config: SubdomainConfig,
    ) -> Self {
        Self {
            sources,
            resolver,
            prober,
            config,
        }
    }

    /// Enumerates subdomains of the registrable domain behind `target` (a URL
    /// or bare host). Only an unusable target is an error; failing sources,
    /// lookups and probes just shrink the result.
    pub async fn discover(&self, target: &str) -> ReconResult<SubdomainReport> {
        let host = host_of(target)
            .ok_or_else(|| ReconError::InvalidTarget(format!("no host in '{target}'")))?;
        let root = extract_root_domain(&host);
        info!(domain = %root, sources = self.sources.len(), "Starting subdomain discovery.");

        let provenance = self.collect_passive(&root).await;
        let candidates = cap_candidates(&provenance, self.config.passive_cap);
        let passive: Vec<DiscoveredSubdomain> = self
            .verify(candidates, self.config.passive_probe_concurrency)
            .await
            .into_iter()
            .map(|(host, reach)| {
                let sources = provenance.get(&host).cloned().unwrap_or_default();
                discovered(host, reach, sources)
            })
            .collect();

        let confirmed: HashSet<String> = passive
            .iter()
            .filter(|row| row.reachable)
            .map(|row| row.subdomain.clone())
            .collect();
        let brute = self.brute_force(&root, &provenance, &confirmed).await;
        let subdomains = merge_discoveries(passive, brute);
        let report = self.build_report(root, subdomains);
        info!(
            domain = %report.domain,
            total = report.total,
            reachable = report.reachable,
            "Subdomain discovery finished."
        );
        Ok(report)
    }

    /// Queries every source concurrently. A source that errors or overruns
    /// its timeout contributes nothing.
    async fn collect_passive(&self, root: &str) -> Provenance {
        let timeout = self.config.source_timeout();
        let answers = join_all(self.sources.iter().map(|source| async move {
            let hosts = match tokio::time::timeout(timeout, source.query(root)).await {
                Ok(Ok(hosts)) => hosts,
                Ok(Err(e)) => {
                    warn!(source = source.name(), error = %e, "Source failed.");
                    Vec::new()
                }
                Err(_) => {
                    warn!(source = source.name(), "Source timed out.");
                    Vec::new()
                }
            };
            (source.name().to_string(), hosts)
        }))
        .await;

        let mut provenance = Provenance::new();
        for (name, raw_hosts) in answers {
            let hosts: HashSet<String> = raw_hosts
                .iter()
                .filter_map(|raw| normalize_candidate(raw, root))
                .collect();
            info!(source = %name, raw = raw_hosts.len(), in_scope = hosts.len(), "Source answered.");
            for host in hosts {
                provenance.entry(host).or_default().push(name.clone());
            }
        }
        provenance
    }

    /// DNS gate, then HTTP probe for whatever resolved.
    async fn verify(
        &self,
        candidates: Vec<String>,
        concurrency: usize,
    ) -> Vec<(String, prober::Reachability)> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let resolved = dns_gate(
            Arc::clone(&self.resolver),
            candidates,
            self.config.dns_batch_size,
            self.config.dns_timeout(),
        )
        .await;
        probe_all(Arc::clone(&self.prober), resolved, concurrency).await
    }

    /// Dictionary pass. Hosts a source reported but that were cut by the cap
    /// or failed verification are retried here and keep their source tags.
    async fn brute_force(
        &self,
        root: &str,
        provenance: &Provenance,
        confirmed: &HashSet<String>,
    ) -> Vec<DiscoveredSubdomain> {
        if self.config.wildcard_check && self.has_wildcard(root).await {
            warn!(domain = %root, "Wildcard DNS detected, skipping brute-force.");
            return Vec::new();
        }

        let candidates = brute_force_candidates(root, confirmed);
        info!(domain = %root, candidates = candidates.len(), "Starting brute-force.");
        self.verify(candidates, self.config.brute_probe_concurrency)
            .await
            .into_iter()
            .map(|(host, reach)| {
                let mut sources = provenance.get(&host).cloned().unwrap_or_default();
                sources.push(BRUTE_FORCE_SOURCE.to_string());
                discovered(host, reach, sources)
            })
            .collect()
    }

    async fn has_wildcard(&self, root: &str) -> bool {
        let nonce = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let probe = format!("vgr-{nonce:x}-nonexistent.{root}");
        tokio::time::timeout(self.config.dns_timeout(), self.resolver.resolves(&probe))
            .await
            .unwrap_or(false)
    }

    fn build_report(&self, domain: String, subdomains: Vec<DiscoveredSubdomain>) -> SubdomainReport {
        let mut sources: BTreeMap<String, usize> = self
            .sources
            .iter()
            .map(|s| (s.name().to_string(), 0))
            .collect();
        sources.insert(BRUTE_FORCE_SOURCE.to_string(), 0);
        for tag in subdomains.iter().flat_map(|s| s.sources.iter()) {
            *sources.entry(tag.clone()).or_default() += 1;
        }

        SubdomainReport {
            domain,
            total: subdomains.len(),
            reachable: subdomains.iter().filter(|s| s.reachable).count(),
            subdomains,
            sources,
        }
    }
}

fn discovered(host: String, reach: prober::Reachability, sources: Vec<String>) -> DiscoveredSubdomain {
    let scheme = if reach.reachable && !reach.secure { "http" } else { "https" };
    DiscoveredSubdomain {
        url: format!("{scheme}://{host}"),
        subdomain: host,
        reachable: reach.reachable,
        status_code: reach.status_code,
        sources,
    }
}

/// The `cap` best-attested candidates: most sources first, then by name.
fn cap_candidates(provenance: &Provenance, cap: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, usize)> = provenance.iter().map(|(h, s)| (h, s.len())).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(cap).map(|(h, _)| h.clone()).collect()
}

/// Dictionary hosts not already confirmed reachable by the passive pass.
fn brute_force_candidates(root: &str, confirmed: &HashSet<String>) -> Vec<String> {
    BRUTE_FORCE_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}.{root}"))
        .filter(|host| !confirmed.contains(host))
        .collect()
}

/// Unions two result sets by subdomain. Source tags are unioned and
/// reachability is OR-ed: a reachable row never becomes unreachable.
/// Output: reachable first, then alphabetical.
pub fn merge_discoveries(
    first: Vec<DiscoveredSubdomain>,
    second: Vec<DiscoveredSubdomain>,
) -> Vec<DiscoveredSubdomain> {
    let mut merged: BTreeMap<String, DiscoveredSubdomain> = BTreeMap::new();

    for item in first.into_iter().chain(second) {
        match merged.get_mut(&item.subdomain) {
            None => {
                merged.insert(item.subdomain.clone(), item);
            }
            Some(existing) => {
                for tag in item.sources {
                    if !existing.sources.contains(&tag) {
                        existing.sources.push(tag);
                    }
                }
                if item.reachable && !existing.reachable {
                    existing.reachable = true;
                    existing.status_code = item.status_code;
                    existing.url = item.url;
                }
            }
        }
    }

    let mut list: Vec<DiscoveredSubdomain> = merged.into_values().collect();
    list.sort_by(|a, b| {
        b.reachable
            .cmp(&a.reachable)
            .then_with(|| a.subdomain.cmp(&b.subdomain))
    });
    list
}
