// src/config.rs

use crate::core::errors::{ReconError, ReconResult};
use crate::core::recon::sources::SourceLimits;
use crate::logging::project_directory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";

/// Every limit the engine uses. Components receive the section they need;
/// nothing reads a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub user_agent: String,
    pub scan: ScanConfig,
    pub crawl: CrawlConfig,
    pub subdomains: SubdomainConfig,
    pub quota: QuotaLimits,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            user_agent: "VanguardRecon/0.1 (+passive-security-scan)".to_string(),
            scan: ScanConfig::default(),
            crawl: CrawlConfig::default(),
            subdomains: SubdomainConfig::default(),
            quota: QuotaLimits::default(),
        }
    }
}

/// Single-page fetch and check battery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub fetch_timeout_ms: u64,
    pub max_body_bytes: usize,
    /// Body prefix (in characters) handed to sync checks.
    pub max_check_body_chars: usize,
    /// Outer deadline for the whole async probe batch.
    pub probe_deadline_ms: u64,
    pub max_redirects: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
            max_body_bytes: 2 * 1024 * 1024,
            max_check_body_chars: 500_000,
            probe_deadline_ms: 12_000,
            max_redirects: 10,
        }
    }
}

impl ScanConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_millis(self.probe_deadline_ms)
    }
}

/// Same-origin link discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub fetch_timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 15,
            fetch_timeout_ms: 8_000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl CrawlConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdomainConfig {
    pub source_timeout_ms: u64,
    /// Bytes read from one OSINT source response.
    pub source_max_body_bytes: usize,
    /// Passive candidates kept before DNS/HTTP verification.
    pub passive_cap: usize,
    pub dns_batch_size: usize,
    pub dns_timeout_ms: u64,
    pub passive_probe_concurrency: usize,
    pub brute_probe_concurrency: usize,
    pub https_timeout_ms: u64,
    pub http_timeout_ms: u64,
    pub wildcard_check: bool,
}

impl Default for SubdomainConfig {
    fn default() -> Self {
        Self {
            source_timeout_ms: 15_000,
            source_max_body_bytes: 8 * 1024 * 1024,
            passive_cap: 100,
            dns_batch_size: 50,
            dns_timeout_ms: 4_000,
            passive_probe_concurrency: 20,
            brute_probe_concurrency: 30,
            https_timeout_ms: 5_000,
            http_timeout_ms: 3_000,
            wildcard_check: false,
        }
    }
}

impl SubdomainConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn source_limits(&self) -> SourceLimits {
        SourceLimits {
            timeout: self.source_timeout(),
            max_body_bytes: self.source_max_body_bytes,
        }
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn https_timeout(&self) -> Duration {
        Duration::from_millis(self.https_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

/// Requests allowed per caller key within one window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuotaLimits {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 3600,
        }
    }
}

impl ReconConfig {
    /// Loads the configuration from `path`, or from `config.json` in the
    /// project config directory when it exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> ReconResult<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let config = match candidate {
            Some(p) => {
                info!(path = %p.display(), "Loading configuration file.");
                let raw = std::fs::read_to_string(&p)
                    .map_err(|e| ReconError::Config(format!("{}: {}", p.display(), e)))?;
                serde_json::from_str::<ReconConfig>(&raw)
                    .map_err(|e| ReconError::Config(format!("{}: {}", p.display(), e)))?
            }
            None => {
                debug!("No configuration file, using defaults.");
                ReconConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReconResult<()> {
        let checks = [
            (self.crawl.max_pages, "crawl.max_pages"),
            (self.crawl.max_body_bytes, "crawl.max_body_bytes"),
            (self.scan.max_body_bytes, "scan.max_body_bytes"),
            (self.subdomains.source_max_body_bytes, "subdomains.source_max_body_bytes"),
            (self.subdomains.passive_cap, "subdomains.passive_cap"),
            (self.subdomains.dns_batch_size, "subdomains.dns_batch_size"),
            (self.subdomains.passive_probe_concurrency, "subdomains.passive_probe_concurrency"),
            (self.subdomains.brute_probe_concurrency, "subdomains.brute_probe_concurrency"),
        ];
        if let Some((_, name)) = checks.iter().find(|(v, _)| *v == 0) {
            return Err(ReconError::Config(format!("{name} must be greater than zero")));
        }
        if self.quota.window_secs == 0 {
            return Err(ReconError::Config("quota.window_secs must be greater than zero".into()));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    project_directory().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
