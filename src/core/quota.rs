// src/core/quota.rs

use crate::config::QuotaLimits;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Verdict for one request against a caller's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub resets_at: DateTime<Utc>,
}

/// Consulted before any scanning work starts. An allowed decision consumes
/// one unit of the caller's quota.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    async fn check(&self, key: &str, limits: &QuotaLimits) -> QuotaDecision;
}

/// Ten years; longer windows are clamped.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    used: u32,
}

/// Fixed-window counter per caller key, held in memory.
#[derive(Debug, Default)]
pub struct InMemoryQuota {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryQuota {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`QuotaGate::check`] with an explicit clock.
    pub async fn check_at(&self, key: &str, limits: &QuotaLimits, now: DateTime<Utc>) -> QuotaDecision {
        let secs = limits.window_secs.min(MAX_WINDOW_SECS) as i64;
        let length = ChronoDuration::seconds(secs);
        let mut windows = self.windows.lock().await;

        let window = windows.entry(key.to_string()).or_insert(Window { started_at: now, used: 0 });
        if now >= window.started_at + length {
            *window = Window { started_at: now, used: 0 };
        }

        let resets_at = window.started_at + length;
        if window.used >= limits.max_requests {
            warn!(key, limit = limits.max_requests, %resets_at, "Quota exhausted.");
            return QuotaDecision {
                allowed: false,
                limit: limits.max_requests,
                remaining: 0,
                resets_at,
            };
        }

        window.used += 1;
        let remaining = limits.max_requests - window.used;
        debug!(key, remaining, "Quota unit consumed.");
        QuotaDecision {
            allowed: true,
            limit: limits.max_requests,
            remaining,
            resets_at,
        }
    }
}

#[async_trait]
impl QuotaGate for InMemoryQuota {
    async fn check(&self, key: &str, limits: &QuotaLimits) -> QuotaDecision {
        self.check_at(key, limits, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_requests: u32) -> QuotaLimits {
        QuotaLimits {
            max_requests,
            window_secs: 60,
        }
    }

    #[tokio::test]
    async fn denies_after_limit_until_window_rolls() {
        let quota = InMemoryQuota::new();
        let start = Utc::now();
        let limits = limits(2);

        let first = quota.check_at("alice", &limits, start).await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(quota.check_at("alice", &limits, start).await.allowed);

        let denied = quota.check_at("alice", &limits, start + ChronoDuration::seconds(10)).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.limit, 2);
        assert_eq!(denied.resets_at, start + ChronoDuration::seconds(60));

        let rolled = quota.check_at("alice", &limits, start + ChronoDuration::seconds(60)).await;
        assert!(rolled.allowed);
        assert_eq!(rolled.remaining, 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let quota = InMemoryQuota::new();
        let limits = limits(1);
        assert!(quota.check("alice", &limits).await.allowed);
        assert!(!quota.check("alice", &limits).await.allowed);
        assert!(quota.check("bob", &limits).await.allowed);
    }

    #[tokio::test]
    async fn zero_limit_never_allows() {
        let quota = InMemoryQuota::new();
        assert!(!quota.check("alice", &limits(0)).await.allowed);
    }
}
