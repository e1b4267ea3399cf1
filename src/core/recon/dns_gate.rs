// src/core/recon/dns_gate.rs

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Answers whether a hostname has any address record.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolves(&self, host: &str) -> bool;
}

/// A/AAAA lookups through hickory: IPv4 first, IPv6 as fallback.
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostResolver for HickoryResolver {
    async fn resolves(&self, host: &str) -> bool {
        // Trailing dot: absolute name, no search-domain expansion.
        let fqdn = format!("{}.", host.trim_end_matches('.'));
        if let Ok(v4) = self.resolver.ipv4_lookup(fqdn.as_str()).await {
            if v4.iter().next().is_some() {
                return true;
            }
        }
        match self.resolver.ipv6_lookup(fqdn.as_str()).await {
            Ok(v6) => v6.iter().next().is_some(),
            Err(e) => {
                debug!(host, error = %e, "No A or AAAA record.");
                false
            }
        }
    }
}

/// Keeps the candidates that resolve. At most `batch_size` lookups are in
/// flight; each one is cut off after `timeout` and then counts as
/// unresolved, so a hung lookup only costs its own slot.
pub async fn dns_gate(
    resolver: Arc<dyn HostResolver>,
    candidates: Vec<String>,
    batch_size: usize,
    timeout: Duration,
) -> Vec<String> {
    let total = candidates.len();
    let confirmed: Vec<String> = stream::iter(candidates)
        .map(|host| {
            let resolver = Arc::clone(&resolver);
            async move {
                let ok = tokio::time::timeout(timeout, resolver.resolves(&host))
                    .await
                    .unwrap_or(false);
                ok.then_some(host)
            }
        })
        .buffer_unordered(batch_size.max(1))
        .filter_map(|host| async move { host })
        .collect()
        .await;

    info!(candidates = total, confirmed = confirmed.len(), "DNS gate finished.");
    confirmed
}
