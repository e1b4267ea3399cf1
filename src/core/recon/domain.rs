// src/core/recon/domain.rs

use url::Url;

/// Public suffixes made of two labels. A host ending in one of these keeps
/// three labels as its registrable domain.
const TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "ltd.uk", "plc.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.nz", "net.nz", "org.nz",
    "co.jp", "ne.jp", "or.jp",
    "co.in", "net.in", "org.in",
    "co.za", "org.za",
    "com.br", "net.br", "org.br",
    "com.mx", "com.ar", "com.tr", "com.cn", "com.hk", "com.sg", "com.tw", "com.my",
    "co.kr", "co.il", "co.id", "co.th",
];

/// Host part of a URL, or the input itself when it is a bare host.
pub fn host_of(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
        .filter(|h| !h.is_empty())
}

/// Registrable domain of `host`: a leading `www.` is dropped, then the last
/// two labels are kept, or three when the last two form a known two-part
/// public suffix.
pub fn extract_root_domain(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if TWO_PART_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

/// Cleans a raw hostname reported by a source. Returns `None` unless the
/// result is `root` or ends in `.root` and has no wildcard, space or `@`.
pub fn normalize_candidate(raw: &str, root: &str) -> Option<String> {
    let name = raw.trim().to_ascii_lowercase();
    let name = name.strip_prefix("*.").unwrap_or(&name).trim_end_matches('.');
    if name.is_empty() || name.contains(['*', ' ', '@']) {
        return None;
    }
    let in_scope = name == root || name.ends_with(&format!(".{root}"));
    in_scope.then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_domain_handles_two_part_suffixes() {
        assert_eq!(extract_root_domain("www.shop.example.co.uk"), "example.co.uk");
        assert_eq!(extract_root_domain("api.example.com"), "example.com");
        assert_eq!(extract_root_domain("www.example.com"), "example.com");
        assert_eq!(extract_root_domain("example.com"), "example.com");
        assert_eq!(extract_root_domain("a.b.c.example.com.au"), "example.com.au");
    }

    #[test]
    fn host_of_accepts_urls_and_bare_hosts() {
        assert_eq!(host_of("https://WWW.Example.com/path?q=1").as_deref(), Some("www.example.com"));
        assert_eq!(host_of("example.org").as_deref(), Some("example.org"));
        assert_eq!(host_of("   "), None);
    }

    #[test]
    fn candidates_are_normalized_and_scoped() {
        assert_eq!(normalize_candidate(" *.API.example.com ", "example.com").as_deref(), Some("api.example.com"));
        assert_eq!(normalize_candidate("example.com", "example.com").as_deref(), Some("example.com"));
        assert_eq!(normalize_candidate("notexample.com", "example.com"), None);
        assert_eq!(normalize_candidate("a.*.example.com", "example.com"), None);
        assert_eq!(normalize_candidate("admin@example.com", "example.com"), None);
        assert_eq!(normalize_candidate("a b.example.com", "example.com"), None);
        assert_eq!(normalize_candidate("example.com.evil.test", "example.com"), None);
    }
}
