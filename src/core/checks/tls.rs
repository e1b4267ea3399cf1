// src/core/checks/tls.rs

use tracing::{debug, error, info};

use crate::core::checks::AsyncProbe;
use crate::core::knowledge_base::finding;
use crate::core::models::Finding;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use native_tls::TlsConnector;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;
use tokio::task::spawn_blocking;
use url::{Host, Url};
use x509_parser::prelude::*;

const EXPIRY_WARNING_DAYS: i64 = 30;

/// Validity window of the peer certificate.
#[derive(Debug, Clone)]
pub struct CertificateValidity {
    pub subject_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl CertificateValidity {
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.not_after.signed_duration_since(now).num_days()
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_before && now < self.not_after
    }
}

/// Connects to the page's host on its HTTPS port and inspects the certificate.
/// Plain-HTTP pages are skipped. The host is resolved asynchronously under
/// the probe timeout; only connect and handshake run on the blocking pool,
/// both bounded by socket timeouts.
pub struct TlsCertificateProbe {
    timeout: Duration,
    resolver: TokioAsyncResolver,
}

impl TlsCertificateProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }

    async fn resolve(&self, host: &Host<&str>, port: u16) -> Result<SocketAddr, String> {
        let ip = match host {
            Host::Ipv4(ip) => IpAddr::V4(*ip),
            Host::Ipv6(ip) => IpAddr::V6(*ip),
            Host::Domain(name) => {
                let fqdn = format!("{}.", name.trim_end_matches('.'));
                let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(fqdn.as_str()))
                    .await
                    .map_err(|_| format!("Resolve Error: timed out after {:?}", self.timeout))?
                    .map_err(|e| format!("Resolve Error: {}", e))?;
                lookup.iter().next().ok_or_else(|| format!("No address for {name}"))?
            }
        };
        Ok(SocketAddr::new(ip, port))
    }
}

#[async_trait]
impl AsyncProbe for TlsCertificateProbe {
    fn name(&self) -> &str {
        "tls-certificate"
    }

    async fn probe(&self, url: &str) -> Result<Vec<Finding>, String> {
        let parsed = Url::parse(url).map_err(|e| e.to_string())?;
        if parsed.scheme() != "https" {
            return Ok(Vec::new());
        }
        let host = parsed.host().ok_or("URL has no host")?;
        let port = parsed.port_or_known_default().unwrap_or(443);
        let timeout = self.timeout;

        info!(host = %host, port, "Starting TLS certificate probe.");
        let scan = match self.resolve(&host, port).await {
            Ok(addr) => {
                let server_name = match host {
                    Host::Domain(name) => name.to_string(),
                    _ => addr.ip().to_string(),
                };
                spawn_blocking(move || fetch_certificate(&server_name, addr, timeout))
                    .await
                    .unwrap_or_else(|e| {
                        error!(panic = %e, "Blocking TLS task panicked!");
                        Err(format!("Task panicked: {}", e))
                    })
            }
            Err(e) => Err(e),
        };

        Ok(analyze_certificate(&scan, Utc::now()))
    }
}

fn fetch_certificate(host: &str, addr: SocketAddr, timeout: Duration) -> Result<CertificateValidity, String> {
    let connector = TlsConnector::new().map_err(|e| format!("TlsConnector Error: {}", e))?;

    debug!(host, %addr, "Connecting TCP stream.");
    let stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| format!("TCP Connection Error: {}", e))?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| format!("Socket Error: {}", e))?;

    let stream = connector
        .connect(host, stream)
        .map_err(|e| format!("TLS Handshake Error: {}", e))?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| format!("Could not get peer certificate: {}", e))?
        .ok_or("Server did not provide a certificate.")?;
    let cert_der = cert
        .to_der()
        .map_err(|e| format!("Could not convert certificate to DER: {}", e))?;
    let (_, x509) =
        parse_x509_certificate(&cert_der).map_err(|e| format!("X.509 Parse Error: {}", e))?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed peer certificate.");
    let validity = x509.validity();
    Ok(CertificateValidity {
        subject_name: x509.subject().to_string(),
        not_before: asn1_time_to_chrono_utc(&validity.not_before),
        not_after: asn1_time_to_chrono_utc(&validity.not_after),
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn analyze_certificate(scan: &Result<CertificateValidity, String>, now: DateTime<Utc>) -> Vec<Finding> {
    match scan {
        Err(e) => {
            debug!(error = %e, "TLS probe failed, reporting handshake failure.");
            finding("TLS_HANDSHAKE_FAILED")
                .map(|f| f.with_evidence(e.clone()))
                .into_iter()
                .collect()
        }
        Ok(cert) if !cert.is_valid_at(now) => {
            debug!(expiry = %cert.not_after, "Certificate outside validity window.");
            finding("TLS_CERT_EXPIRED")
                .map(|f| f.with_evidence(format!("not after {}", cert.not_after)))
                .into_iter()
                .collect()
        }
        Ok(cert) => {
            let days = cert.days_until_expiry(now);
            if (0..=EXPIRY_WARNING_DAYS).contains(&days) {
                finding("TLS_CERT_EXPIRING_SOON")
                    .map(|f| f.with_evidence(format!("{days} days left for {}", cert.subject_name)))
                    .into_iter()
                    .collect()
            } else {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn cert(now: DateTime<Utc>, days_left: i64) -> CertificateValidity {
        CertificateValidity {
            subject_name: "CN=a.test".to_string(),
            not_before: now - ChronoDuration::days(300),
            not_after: now + ChronoDuration::days(days_left),
        }
    }

    #[test]
    fn expired_certificate_is_critical() {
        let now = Utc::now();
        let findings = analyze_certificate(&Ok(cert(now, -2)), now);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "TLS_CERT_EXPIRED");
    }

    #[test]
    fn expiring_certificate_is_flagged() {
        let now = Utc::now();
        let findings = analyze_certificate(&Ok(cert(now, 10)), now);
        assert_eq!(findings[0].id, "TLS_CERT_EXPIRING_SOON");
        assert!(analyze_certificate(&Ok(cert(now, 200)), now).is_empty());
    }

    #[test]
    fn handshake_error_becomes_finding() {
        let findings = analyze_certificate(&Err("TLS Handshake Error: bad".into()), Utc::now());
        assert_eq!(findings[0].id, "TLS_HANDSHAKE_FAILED");
    }

    #[tokio::test]
    async fn plain_http_is_skipped() {
        let probe = TlsCertificateProbe::new(Duration::from_millis(100));
        assert!(probe.probe("http://a.test/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ip_literal_skips_dns_and_reports_connect_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TlsCertificateProbe::new(Duration::from_millis(500));
        let findings = probe.probe(&format!("https://127.0.0.1:{port}/")).await.unwrap();
        assert_eq!(findings[0].id, "TLS_HANDSHAKE_FAILED");
        assert!(findings[0].evidence.as_deref().unwrap_or_default().starts_with("TCP Connection Error"));
    }

    #[tokio::test]
    async fn unresolvable_host_fails_within_the_timeout() {
        let probe = TlsCertificateProbe::new(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let findings = probe.probe("https://no-such-host.invalid/").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(findings[0].id, "TLS_HANDSHAKE_FAILED");
        assert!(findings[0].evidence.as_deref().unwrap_or_default().starts_with("Resolve Error"));
    }
}
