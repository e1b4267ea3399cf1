// src/core/checks/fingerprint.rs

use crate::core::checks::CheckPredicate;
use crate::core::knowledge_base::finding;
use crate::core::models::{Finding, ResponseHeaders};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

// Product name followed by a version, e.g. "WordPress 6.4.2" or "Astro v4.1.0".
static RE_GENERATOR_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-z][\w .!-]*?)\s+v?(\d+(?:\.\d+)+)").unwrap());

/// Flags a `<meta name="generator">` tag that includes a version number.
pub struct GeneratorVersionCheck;

impl CheckPredicate for GeneratorVersionCheck {
    fn name(&self) -> &str {
        "generator-version"
    }

    fn check(&self, url: &str, _headers: &ResponseHeaders, body: &str) -> Option<Finding> {
        // Cheap pre-filter before building a DOM.
        if !body.to_ascii_lowercase().contains("generator") {
            return None;
        }
        let selector = Selector::parse("meta[name]").ok()?;
        let document = Html::parse_document(body);
        let content = document
            .select(&selector)
            .filter(|el| {
                el.value()
                    .attr("name")
                    .is_some_and(|n| n.eq_ignore_ascii_case("generator"))
            })
            .find_map(|el| el.value().attr("content"))?;

        let caps = RE_GENERATOR_VERSION.captures(content)?;
        let product = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let version = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        debug!(url, product, version, "Generator version disclosed.");
        finding("DISCLOSURE_GENERATOR_VERSION").map(|f| f.with_evidence(format!("{product} {version}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_versioned_generator() {
        let body = r#"<html><head><meta name="generator" content="WordPress 6.4.2"></head></html>"#;
        let f = GeneratorVersionCheck.check("https://a.test/", &ResponseHeaders::new(), body).unwrap();
        assert_eq!(f.id, "DISCLOSURE_GENERATOR_VERSION");
        assert_eq!(f.evidence.as_deref(), Some("WordPress 6.4.2"));
    }

    #[test]
    fn generator_without_version_is_fine() {
        let body = r#"<html><head><meta name="generator" content="Hugo"></head></html>"#;
        assert!(GeneratorVersionCheck.check("https://a.test/", &ResponseHeaders::new(), body).is_none());
        assert!(GeneratorVersionCheck.check("https://a.test/", &ResponseHeaders::new(), "<p>hi</p>").is_none());
    }
}
