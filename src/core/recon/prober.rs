// src/core/recon/prober.rs

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of a reachability probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reachability {
    pub reachable: bool,
    pub status_code: Option<u16>,
    /// Answered over HTTPS rather than the plain-HTTP fallback.
    pub secure: bool,
}

impl Reachability {
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn responded(status: u16, secure: bool) -> Self {
        Self {
            reachable: true,
            status_code: Some(status),
            secure,
        }
    }
}

#[async_trait]
pub trait ReachabilityProber: Send + Sync {
    async fn probe(&self, host: &str) -> Reachability;
}

/// `HEAD https://host` first, then `HEAD http://host` with a shorter timeout.
/// Any HTTP response, whatever its status, counts as reachable.
pub struct HttpProber {
    client: reqwest::Client,
    https_timeout: Duration,
    http_timeout: Duration,
}

impl HttpProber {
    pub fn new(client: reqwest::Client, https_timeout: Duration, http_timeout: Duration) -> Self {
        Self {
            client,
            https_timeout,
            http_timeout,
        }
    }

    async fn head(&self, url: &str, timeout: Duration) -> Option<u16> {
        match self.client.head(url).timeout(timeout).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                debug!(url, error = %e, "HEAD probe failed.");
                None
            }
        }
    }
}

#[async_trait]
impl ReachabilityProber for HttpProber {
    async fn probe(&self, host: &str) -> Reachability {
        if let Some(status) = self.head(&format!("https://{host}"), self.https_timeout).await {
            return Reachability::responded(status, true);
        }
        match self.head(&format!("http://{host}"), self.http_timeout).await {
            Some(status) => Reachability::responded(status, false),
            None => Reachability::unreachable(),
        }
    }
}

/// Probes every host with at most `concurrency` probes in flight. Output
/// order is unspecified.
pub async fn probe_all(
    prober: Arc<dyn ReachabilityProber>,
    hosts: Vec<String>,
    concurrency: usize,
) -> Vec<(String, Reachability)> {
    let results: Vec<(String, Reachability)> = stream::iter(hosts)
        .map(|host| {
            let prober = Arc::clone(&prober);
            async move {
                let outcome = prober.probe(&host).await;
                (host, outcome)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let reachable = results.iter().filter(|(_, r)| r.reachable).count();
    info!(probed = results.len(), reachable, "Reachability probing finished.");
    results
}
