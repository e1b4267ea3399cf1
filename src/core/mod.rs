// src/core/mod.rs

// The `core` module holds the scanning engine. Nothing in here prints or
// reads configuration files; limits come in through constructors.

/// Data structures shared by every component: findings, severities, page
/// and crawl results, subdomain reports and the request/response shapes.
pub mod models;

pub mod errors;

/// Size-capped reading of response bodies.
pub mod body;

/// Static catalogue of finding codes with their descriptions and remediation.
pub mod knowledge_base;

/// Check predicates, async probes and the runner that executes them.
pub mod checks;

/// Page fetching, same-origin link discovery and crawling.
pub mod scanner;

/// Subdomain enumeration from OSINT sources and a brute-force dictionary.
pub mod recon;

pub mod quota;
