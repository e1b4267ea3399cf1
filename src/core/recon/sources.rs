// src/core/recon/sources.rs

//! Passive OSINT adapters. Each one asks a public service which hostnames it
//! has seen under a domain. Results are raw: normalization and scoping
//! happen in the caller.

use crate::core::body::read_bounded;
use crate::core::errors::{ReconError, ReconResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait SubdomainSource: Send + Sync {
    /// Provenance tag attached to every hostname this source reports.
    fn name(&self) -> &str;

    async fn query(&self, root_domain: &str) -> ReconResult<Vec<String>>;
}

/// Per-request limits applied by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLimits {
    pub timeout: Duration,
    /// Response bytes read before the rest of the body is discarded.
    pub max_body_bytes: usize,
}

/// Shared plumbing: client, base URL and limits.
#[derive(Clone)]
struct SourceClient {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    limits: SourceLimits,
}

impl SourceClient {
    fn error(&self, reason: impl ToString) -> ReconError {
        ReconError::Source {
            source_name: self.name.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn get_text(&self, url: &str) -> ReconResult<String> {
        debug!(source = self.name, url, "Querying source.");
        let response = self
            .client
            .get(url)
            .timeout(self.limits.timeout)
            .send()
            .await
            .map_err(|e| self.error(e))?;
        if !response.status().is_success() {
            return Err(self.error(format!("HTTP {}", response.status())));
        }
        Ok(read_bounded(response, self.limits.max_body_bytes).await)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> ReconResult<T> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text).map_err(|e| self.error(format!("bad JSON: {e}")))
    }
}

// --- crt.sh ---

#[derive(Debug, Deserialize)]
struct CertificateEntry {
    name_value: String,
}

/// Certificate transparency logs via crt.sh.
pub struct CrtShSource(SourceClient);

impl CrtShSource {
    pub const DEFAULT_BASE: &'static str = "https://crt.sh";

    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limits: SourceLimits) -> Self {
        Self(SourceClient { name: "crt.sh", client, base_url: base_url.into(), limits })
    }
}

#[async_trait]
impl SubdomainSource for CrtShSource {
    fn name(&self) -> &str {
        self.0.name
    }

    async fn query(&self, root_domain: &str) -> ReconResult<Vec<String>> {
        let url = format!("{}/?q=%25.{}&output=json", self.0.base_url, root_domain);
        let entries: Vec<CertificateEntry> = self.0.get_json(&url).await?;
        // One certificate may list several names separated by newlines.
        Ok(entries
            .iter()
            .flat_map(|e| e.name_value.lines())
            .map(str::to_string)
            .collect())
    }
}

// --- HackerTarget ---

/// HackerTarget host search; answers `host,ip` lines as plain text.
pub struct HackerTargetSource(SourceClient);

impl HackerTargetSource {
    pub const DEFAULT_BASE: &'static str = "https://api.hackertarget.com";

    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limits: SourceLimits) -> Self {
        Self(SourceClient { name: "hackertarget", client, base_url: base_url.into(), limits })
    }
}

#[async_trait]
impl SubdomainSource for HackerTargetSource {
    fn name(&self) -> &str {
        self.0.name
    }

    async fn query(&self, root_domain: &str) -> ReconResult<Vec<String>> {
        let url = format!("{}/hostsearch/?q={}", self.0.base_url, root_domain);
        let text = self.0.get_text(&url).await?;
        // Errors come back as 200 with a message ("API count exceeded ...").
        if text.starts_with("error") || text.contains("API count exceeded") {
            return Err(self.0.error(text.lines().next().unwrap_or_default()));
        }
        Ok(text
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(str::to_string)
            .collect())
    }
}

// --- AlienVault OTX ---

/// AlienVault OTX passive DNS.
pub struct AlienVaultSource(SourceClient);

impl AlienVaultSource {
    pub const DEFAULT_BASE: &'static str = "https://otx.alienvault.com";

    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limits: SourceLimits) -> Self {
        Self(SourceClient { name: "alienvault", client, base_url: base_url.into(), limits })
    }
}

#[async_trait]
impl SubdomainSource for AlienVaultSource {
    fn name(&self) -> &str {
        self.0.name
    }

    async fn query(&self, root_domain: &str) -> ReconResult<Vec<String>> {
        let url = format!(
            "{}/api/v1/indicators/domain/{}/passive_dns",
            self.0.base_url, root_domain
        );
        let json: Value = self.0.get_json(&url).await?;
        Ok(json["passive_dns"]
            .as_array()
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r["hostname"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

// --- Anubis ---

/// Anubis subdomain database; answers a JSON array of names.
pub struct AnubisSource(SourceClient);

impl AnubisSource {
    pub const DEFAULT_BASE: &'static str = "https://jldc.me";

    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limits: SourceLimits) -> Self {
        Self(SourceClient { name: "anubis", client, base_url: base_url.into(), limits })
    }
}

#[async_trait]
impl SubdomainSource for AnubisSource {
    fn name(&self) -> &str {
        self.0.name
    }

    async fn query(&self, root_domain: &str) -> ReconResult<Vec<String>> {
        let url = format!("{}/anubis/subdomains/{}", self.0.base_url, root_domain);
        self.0.get_json::<Vec<String>>(&url).await
    }
}

/// The built-in adapters pointed at their public endpoints.
pub fn default_sources(client: reqwest::Client, limits: SourceLimits) -> Vec<Arc<dyn SubdomainSource>> {
    let crtsh: Arc<dyn SubdomainSource> =
        Arc::new(CrtShSource::new(client.clone(), CrtShSource::DEFAULT_BASE, limits));
    let hackertarget: Arc<dyn SubdomainSource> =
        Arc::new(HackerTargetSource::new(client.clone(), HackerTargetSource::DEFAULT_BASE, limits));
    let alienvault: Arc<dyn SubdomainSource> =
        Arc::new(AlienVaultSource::new(client.clone(), AlienVaultSource::DEFAULT_BASE, limits));
    let anubis: Arc<dyn SubdomainSource> =
        Arc::new(AnubisSource::new(client, AnubisSource::DEFAULT_BASE, limits));
    vec![crtsh, hackertarget, alienvault, anubis]
}
