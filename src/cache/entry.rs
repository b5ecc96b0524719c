//! Cache entry envelope.
//!
//! The durable store enforces hard expiry; the envelope carries what the
//! revalidation path needs on top of that: creation time, the TTL the
//! entry was written with, and the stale threshold as a fraction of it.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Freshness classification of a cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Still servable, but past the stale threshold; a background refresh
    /// should be dispatched.
    Stale,
    Expired,
}

/// A serialized value with revalidation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: OffsetDateTime,
    pub ttl_seconds: u64,
    /// Fraction of the TTL after which the entry counts as stale.
    /// Always strictly below 1.0, so stale_threshold * ttl < ttl.
    pub stale_threshold: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration, stale_threshold: f64) -> Self {
        Self {
            value,
            created_at: OffsetDateTime::now_utc(),
            ttl_seconds: ttl.as_secs(),
            stale_threshold: stale_threshold.clamp(0.05, 0.95),
            tags: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn age(&self, now: OffsetDateTime) -> Duration {
        (now - self.created_at).try_into().unwrap_or(Duration::ZERO)
    }

    pub fn freshness(&self, now: OffsetDateTime) -> Freshness {
        let age = self.age(now).as_secs_f64();
        let ttl = self.ttl_seconds as f64;
        if age >= ttl {
            Freshness::Expired
        } else if age > self.stale_threshold * ttl {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}
