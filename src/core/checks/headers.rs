// src/core/checks/headers.rs

use crate::core::checks::CheckPredicate;
use crate::core::knowledge_base::finding;
use crate::core::models::{Finding, ResponseHeaders};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static RE_VERSIONED_SERVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][\w.-]*/\d+(\.\d+)*").unwrap());

fn header<'a>(headers: &'a ResponseHeaders, name: &str) -> Option<&'a str> {
    headers.get(name).map(String::as_str)
}

fn is_https(url: &str) -> bool {
    url.starts_with("https://")
}

/// `Strict-Transport-Security` on HTTPS pages.
pub struct HstsCheck;

impl CheckPredicate for HstsCheck {
    fn name(&self) -> &str {
        "hsts"
    }

    fn check(&self, url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        if !is_https(url) || header(headers, "strict-transport-security").is_some() {
            return None;
        }
        debug!(url, "HSTS header missing.");
        finding("HEADERS_HSTS_MISSING")
    }
}

pub struct CspCheck;

impl CheckPredicate for CspCheck {
    fn name(&self) -> &str {
        "csp"
    }

    fn check(&self, url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        if header(headers, "content-security-policy").is_some() {
            return None;
        }
        debug!(url, "CSP header missing.");
        finding("HEADERS_CSP_MISSING")
    }
}

/// Either `X-Frame-Options` or CSP `frame-ancestors` protects against framing.
pub struct ClickjackingCheck;

impl CheckPredicate for ClickjackingCheck {
    fn name(&self) -> &str {
        "clickjacking"
    }

    fn check(&self, url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        if header(headers, "x-frame-options").is_some() {
            return None;
        }
        let has_frame_ancestors = header(headers, "content-security-policy")
            .map(|csp| csp.to_ascii_lowercase().contains("frame-ancestors"))
            .unwrap_or(false);
        if has_frame_ancestors {
            return None;
        }
        debug!(url, "No framing protection.");
        finding("HEADERS_CLICKJACKING_UNPROTECTED")
    }
}

pub struct ContentTypeOptionsCheck;

impl CheckPredicate for ContentTypeOptionsCheck {
    fn name(&self) -> &str {
        "x-content-type-options"
    }

    fn check(&self, _url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        match header(headers, "x-content-type-options") {
            Some(v) if v.trim().eq_ignore_ascii_case("nosniff") => None,
            _ => finding("HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
        }
    }
}

/// A `Server` header carrying a product/version token.
pub struct ServerVersionCheck;

impl CheckPredicate for ServerVersionCheck {
    fn name(&self) -> &str {
        "server-version"
    }

    fn check(&self, _url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        let server = header(headers, "server")?;
        let token = RE_VERSIONED_SERVER.find(server)?;
        finding("DISCLOSURE_SERVER_VERSION").map(|f| f.with_evidence(format!("Server: {}", token.as_str())))
    }
}

pub struct PoweredByCheck;

impl CheckPredicate for PoweredByCheck {
    fn name(&self) -> &str {
        "x-powered-by"
    }

    fn check(&self, _url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        let value = header(headers, "x-powered-by")?;
        finding("DISCLOSURE_X_POWERED_BY").map(|f| f.with_evidence(format!("X-Powered-By: {value}")))
    }
}

/// Cookie attributes. Multiple `Set-Cookie` headers arrive joined by "\n".
/// Reports the missing `Secure` flag first (HTTPS only), then `HttpOnly`.
pub struct CookieFlagsCheck;

impl CheckPredicate for CookieFlagsCheck {
    fn name(&self) -> &str {
        "cookie-flags"
    }

    fn check(&self, url: &str, headers: &ResponseHeaders, _body: &str) -> Option<Finding> {
        let cookies = header(headers, "set-cookie")?;
        let cookies: Vec<&str> = cookies.lines().filter(|c| !c.trim().is_empty()).collect();

        let lacks = |flag: &str| {
            cookies.iter().find(|cookie| {
                !cookie
                    .split(';')
                    .skip(1)
                    .any(|attr| attr.trim().eq_ignore_ascii_case(flag))
            })
            .copied()
        };
        let cookie_name = |cookie: &str| cookie.split('=').next().unwrap_or("").trim().to_string();

        if is_https(url) {
            if let Some(cookie) = lacks("secure") {
                return finding("COOKIES_MISSING_SECURE")
                    .map(|f| f.with_evidence(format!("cookie: {}", cookie_name(cookie))));
            }
        }
        let cookie = lacks("httponly")?;
        finding("COOKIES_MISSING_HTTPONLY").map(|f| f.with_evidence(format!("cookie: {}", cookie_name(cookie))))
    }
}

/// All header predicates, in report order.
pub fn default_header_checks() -> Vec<Arc<dyn CheckPredicate>> {
    vec![
        Arc::new(HstsCheck),
        Arc::new(CspCheck),
        Arc::new(ClickjackingCheck),
        Arc::new(ContentTypeOptionsCheck),
        Arc::new(ServerVersionCheck),
        Arc::new(PoweredByCheck),
        Arc::new(CookieFlagsCheck),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> ResponseHeaders {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn hsts_only_applies_to_https() {
        let empty = ResponseHeaders::new();
        assert!(HstsCheck.check("http://a.test/", &empty, "").is_none());
        assert_eq!(HstsCheck.check("https://a.test/", &empty, "").unwrap().id, "HEADERS_HSTS_MISSING");
        let h = headers(&[("strict-transport-security", "max-age=31536000")]);
        assert!(HstsCheck.check("https://a.test/", &h, "").is_none());
    }

    #[test]
    fn frame_ancestors_counts_as_clickjacking_protection() {
        let h = headers(&[("content-security-policy", "default-src 'self'; frame-ancestors 'none'")]);
        assert!(ClickjackingCheck.check("https://a.test/", &h, "").is_none());
        assert!(ClickjackingCheck.check("https://a.test/", &ResponseHeaders::new(), "").is_some());
    }

    #[test]
    fn versioned_server_header_is_reported_with_evidence() {
        let h = headers(&[("server", "nginx/1.18.0 (Ubuntu)")]);
        let f = ServerVersionCheck.check("https://a.test/", &h, "").unwrap();
        assert_eq!(f.evidence.as_deref(), Some("Server: nginx/1.18.0"));
        let h = headers(&[("server", "cloudflare")]);
        assert!(ServerVersionCheck.check("https://a.test/", &h, "").is_none());
    }

    #[test]
    fn cookie_flags_checked_per_cookie() {
        let h = headers(&[("set-cookie", "a=1; Secure; HttpOnly\nsid=2; Path=/; Secure")]);
        let f = CookieFlagsCheck.check("https://a.test/", &h, "").unwrap();
        assert_eq!(f.id, "COOKIES_MISSING_HTTPONLY");
        assert_eq!(f.evidence.as_deref(), Some("cookie: sid"));

        let h = headers(&[("set-cookie", "sid=2; HttpOnly")]);
        let f = CookieFlagsCheck.check("https://a.test/", &h, "").unwrap();
        assert_eq!(f.id, "COOKIES_MISSING_SECURE");
        assert!(CookieFlagsCheck.check("http://a.test/", &h, "").is_none());
    }

    #[test]
    fn nosniff_satisfies_content_type_options() {
        let h = headers(&[("x-content-type-options", "nosniff")]);
        assert!(ContentTypeOptionsCheck.check("https://a.test/", &h, "").is_none());
    }
}
