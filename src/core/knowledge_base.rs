//! Static catalog of the findings the built-in checks can emit, with
//! human-readable explanations and remediation steps. Checks reference
//! entries by code; the code becomes the finding id used for cross-page
//! deduplication.

use crate::core::models::{Finding, Severity};
use std::fmt;

/// High-level grouping of findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingCategory {
    /// HTTP security headers.
    Headers,
    /// Cookie attributes.
    Cookies,
    /// Software and version leaks.
    Disclosure,
    /// Certificates and TLS configuration.
    Tls,
    /// DNS records protecting the domain's mail.
    Dns,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingCategory::Headers => write!(f, "headers"),
            FindingCategory::Cookies => write!(f, "cookies"),
            FindingCategory::Disclosure => write!(f, "disclosure"),
            FindingCategory::Tls => write!(f, "tls"),
            FindingCategory::Dns => write!(f, "dns"),
        }
    }
}

/// Everything needed to present one kind of finding.
pub struct FindingDetail {
    /// Machine-readable identifier, e.g. "HEADERS_CSP_MISSING".
    pub code: &'static str,
    pub title: &'static str,
    pub category: FindingCategory,
    pub severity: Severity,
    pub description: &'static str,
    pub remediation: &'static str,
}

impl FindingDetail {
    pub fn to_finding(&self) -> Finding {
        Finding {
            id: self.code.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            severity: self.severity,
            category: self.category.to_string(),
            remediation: self.remediation.to_string(),
            evidence: None,
        }
    }
}

static FINDINGS: &[FindingDetail] = &[
    // --- HTTP Headers ---
    FindingDetail {
        code: "HEADERS_HSTS_MISSING",
        title: "HSTS Header Missing",
        category: FindingCategory::Headers,
        severity: Severity::Medium,
        description: "The HTTP Strict-Transport-Security (HSTS) header instructs browsers to only communicate with the site over HTTPS. It protects against protocol downgrade attacks and cookie hijacking.",
        remediation: "Add the 'Strict-Transport-Security' header to HTTPS responses. A strong value is 'max-age=31536000; includeSubDomains; preload'.",
    },
    FindingDetail {
        code: "HEADERS_CSP_MISSING",
        title: "CSP Header Missing",
        category: FindingCategory::Headers,
        severity: Severity::Medium,
        description: "Content-Security-Policy (CSP) helps prevent Cross-Site Scripting (XSS) and data injection by defining which resources a browser is allowed to load.",
        remediation: "Send a Content-Security-Policy header that defines trusted sources for scripts, styles and other assets. Start restrictive and open up as needed.",
    },
    FindingDetail {
        code: "HEADERS_CLICKJACKING_UNPROTECTED",
        title: "Clickjacking Protection Missing",
        category: FindingCategory::Headers,
        severity: Severity::Medium,
        description: "Neither X-Frame-Options nor a CSP 'frame-ancestors' directive is set, so the page can be loaded in an invisible iframe to trick users into clicking on attacker-controlled content.",
        remediation: "Set 'X-Frame-Options: DENY' (or 'SAMEORIGIN'), or add \"frame-ancestors 'none'\" to the Content-Security-Policy.",
    },
    FindingDetail {
        code: "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
        title: "X-Content-Type-Options Missing",
        category: FindingCategory::Headers,
        severity: Severity::Low,
        description: "Without this header browsers may guess the content type of a response (MIME sniffing), letting a file disguised as an image be executed as a script.",
        remediation: "Add the 'X-Content-Type-Options' header with the value 'nosniff'.",
    },
    // --- Disclosure ---
    FindingDetail {
        code: "DISCLOSURE_SERVER_VERSION",
        title: "Server Version Disclosed",
        category: FindingCategory::Disclosure,
        severity: Severity::Low,
        description: "The 'Server' header reveals the exact software version, which helps attackers pick known exploits for that release.",
        remediation: "Configure the web server to send a generic 'Server' value (e.g. 'server_tokens off' in Nginx, 'ServerTokens Prod' in Apache).",
    },
    FindingDetail {
        code: "DISCLOSURE_X_POWERED_BY",
        title: "X-Powered-By Header Present",
        category: FindingCategory::Disclosure,
        severity: Severity::Low,
        description: "The 'X-Powered-By' header advertises the application framework or language runtime behind the site.",
        remediation: "Remove the 'X-Powered-By' header at the application or reverse-proxy layer.",
    },
    FindingDetail {
        code: "DISCLOSURE_GENERATOR_VERSION",
        title: "Generator Version Disclosed",
        category: FindingCategory::Disclosure,
        severity: Severity::Info,
        description: "A <meta name=\"generator\"> tag exposes the CMS or site generator together with its version.",
        remediation: "Remove the generator meta tag or strip the version number from it in the CMS settings.",
    },
    // --- Cookies ---
    FindingDetail {
        code: "COOKIES_MISSING_SECURE",
        title: "Cookie Without Secure Flag",
        category: FindingCategory::Cookies,
        severity: Severity::Medium,
        description: "A cookie set over HTTPS lacks the 'Secure' attribute and may be sent over plain HTTP, where it can be intercepted.",
        remediation: "Add the 'Secure' attribute to every cookie set by the application.",
    },
    FindingDetail {
        code: "COOKIES_MISSING_HTTPONLY",
        title: "Cookie Without HttpOnly Flag",
        category: FindingCategory::Cookies,
        severity: Severity::Low,
        description: "A cookie lacks the 'HttpOnly' attribute, so scripts running in the page (including injected ones) can read it.",
        remediation: "Add the 'HttpOnly' attribute to session and authentication cookies.",
    },
    // --- TLS ---
    FindingDetail {
        code: "TLS_HANDSHAKE_FAILED",
        title: "TLS Handshake Failed",
        category: FindingCategory::Tls,
        severity: Severity::High,
        description: "A secure TLS connection could not be established. Causes include an invalid or untrusted certificate, unsupported cipher suites or other server misconfiguration.",
        remediation: "Install a valid, trusted certificate for the correct host name and review the server's TLS configuration.",
    },
    FindingDetail {
        code: "TLS_CERT_EXPIRED",
        title: "TLS Certificate Expired",
        category: FindingCategory::Tls,
        severity: Severity::Critical,
        description: "The certificate is outside its validity period. Browsers show blocking security warnings and users lose trust in the site.",
        remediation: "Renew the certificate immediately and automate renewal (e.g. Let's Encrypt with Certbot).",
    },
    FindingDetail {
        code: "TLS_CERT_EXPIRING_SOON",
        title: "TLS Certificate Expiring Soon",
        category: FindingCategory::Tls,
        severity: Severity::Medium,
        description: "The certificate expires within 30 days.",
        remediation: "Renew the certificate before it expires and verify that automated renewal works.",
    },
    // --- DNS ---
    FindingDetail {
        code: "DNS_SPF_MISSING",
        title: "SPF Record Missing",
        category: FindingCategory::Dns,
        severity: Severity::Low,
        description: "No Sender Policy Framework (SPF) record lists the servers allowed to send mail for the domain, which makes spoofing easier.",
        remediation: "Publish a TXT record such as 'v=spf1 include:_spf.example.net -all' listing the legitimate mail senders.",
    },
    FindingDetail {
        code: "DNS_DMARC_MISSING",
        title: "DMARC Record Missing",
        category: FindingCategory::Dns,
        severity: Severity::Medium,
        description: "No DMARC policy tells receiving mail servers what to do with mail that fails SPF/DKIM, so the domain can be used for phishing.",
        remediation: "Add a TXT record at '_dmarc.<domain>', starting with 'v=DMARC1; p=none;' and moving to 'p=quarantine' or 'p=reject'.",
    },
    FindingDetail {
        code: "DNS_DMARC_POLICY_NONE",
        title: "DMARC Policy is 'none'",
        category: FindingCategory::Dns,
        severity: Severity::Low,
        description: "The DMARC policy only monitors. It does not instruct receivers to quarantine or reject spoofed mail.",
        remediation: "Once legitimate mail passes SPF/DKIM, change the policy to 'p=quarantine' or 'p=reject'.",
    },
];

/// Looks up the catalog entry for `code`.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}

/// Builds a finding for `code`, or `None` if the code is unknown.
pub fn finding(code: &str) -> Option<Finding> {
    get_finding_detail(code).map(FindingDetail::to_finding)
}
