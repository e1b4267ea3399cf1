// src/core/checks/email_dns.rs

use tracing::{debug, info, warn};

use crate::core::checks::AsyncProbe;
use crate::core::knowledge_base::finding;
use crate::core::models::Finding;
use crate::core::recon::domain::extract_root_domain;
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use url::Url;

/// What the TXT lookups found for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailPolicy {
    pub spf: Option<String>,
    pub dmarc: Option<String>,
}

impl MailPolicy {
    /// The `p=` tag of the DMARC record.
    pub fn dmarc_policy(&self) -> Option<String> {
        self.dmarc.as_ref().and_then(|record| {
            record
                .split(';')
                .find(|s| s.trim().starts_with("p="))
                .and_then(|s| s.trim().split('=').nth(1))
                .map(|s| s.trim().to_ascii_lowercase())
        })
    }
}

/// Checks the SPF and DMARC records of the page's registrable domain.
pub struct EmailAuthProbe {
    resolver: TokioAsyncResolver,
}

impl EmailAuthProbe {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }

    /// Returns `Ok(None)` when the name has no TXT records matching `prefix`.
    async fn lookup_txt(&self, name: &str, prefix: &str) -> Result<Option<String>, String> {
        debug!(name, "Looking up TXT records.");
        match self.resolver.txt_lookup(name).await {
            Ok(records) => Ok(records
                .iter()
                .map(|r| r.to_string())
                .find(|r| r.starts_with(prefix))),
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(None),
            Err(e) => {
                warn!(name, error = %e, "TXT lookup failed.");
                Err(format!("DNS Error: {}", e))
            }
        }
    }
}

impl Default for EmailAuthProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncProbe for EmailAuthProbe {
    fn name(&self) -> &str {
        "email-auth-dns"
    }

    async fn probe(&self, url: &str) -> Result<Vec<Finding>, String> {
        let host = Url::parse(url)
            .map_err(|e| e.to_string())?
            .host_str()
            .map(str::to_string)
            .ok_or("URL has no host")?;
        let domain = extract_root_domain(&host);
        info!(domain = %domain, "Starting mail DNS probe.");

        let dmarc_name = format!("_dmarc.{domain}");
        let (spf, dmarc) = tokio::join!(
            self.lookup_txt(&domain, "v=spf1"),
            self.lookup_txt(&dmarc_name, "v=DMARC1")
        );

        // A resolver failure is not evidence of a missing record.
        let policy = MailPolicy { spf: spf?, dmarc: dmarc? };
        Ok(analyze_mail_policy(&policy))
    }
}

fn analyze_mail_policy(policy: &MailPolicy) -> Vec<Finding> {
    let mut codes = Vec::new();

    match (&policy.dmarc, policy.dmarc_policy()) {
        (None, _) => codes.push("DNS_DMARC_MISSING"),
        (Some(_), Some(p)) if p == "none" => codes.push("DNS_DMARC_POLICY_NONE"),
        _ => {}
    }
    if policy.spf.is_none() {
        codes.push("DNS_SPF_MISSING");
    }

    codes.into_iter().filter_map(finding).collect()
}
