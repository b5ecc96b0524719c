//! Per-entity popularity tracking.
//!
//! Hits are counted into day-bucketed counters in the durable store and
//! aggregated with recency weighting: today counts double, yesterday
//! single. Counters expire after a bounded retention window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use time::{Date, OffsetDateTime};
use tracing::debug;

use super::keys;
use super::store::{CacheStore, PutOptions, StoreError, get_json, put_json};

const TODAY_WEIGHT: u64 = 2;
const YESTERDAY_WEIGHT: u64 = 1;

pub struct PopularityTracker {
    store: Arc<dyn CacheStore>,
    retention: Duration,
}

impl PopularityTracker {
    pub fn new(store: Arc<dyn CacheStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Increment today's counter for `entity`.
    ///
    /// Read-modify-write, last writer wins; concurrent hits may undercount
    /// slightly, which is acceptable for a ranking signal.
    pub async fn record_hit(&self, entity: &str) -> Result<(), StoreError> {
        let key = keys::popularity_key(today(), entity);
        let count: u64 = get_json(self.store.as_ref(), &key).await?.unwrap_or(0);
        put_json(
            self.store.as_ref(),
            &key,
            &(count + 1),
            PutOptions::with_ttl(self.retention),
        )
        .await?;
        debug!(entity, count = count + 1, "recorded popularity hit");
        Ok(())
    }

    /// Weighted score for a single entity, scaled into 0–100.
    ///
    /// Returns `None` when the entity has no recorded hits, so callers can
    /// apply the unknown-entity default.
    pub async fn score(&self, entity: &str) -> Result<Option<u8>, StoreError> {
        let weighted = self.weighted_hits(entity).await?;
        if weighted == 0 {
            return Ok(None);
        }
        Ok(Some(weighted.min(100) as u8))
    }

    async fn weighted_hits(&self, entity: &str) -> Result<u64, StoreError> {
        let today_key = keys::popularity_key(today(), entity);
        let yesterday_key = keys::popularity_key(yesterday(), entity);
        let today_hits: u64 = get_json(self.store.as_ref(), &today_key).await?.unwrap_or(0);
        let yesterday_hits: u64 = get_json(self.store.as_ref(), &yesterday_key)
            .await?
            .unwrap_or(0);
        Ok(TODAY_WEIGHT * today_hits + YESTERDAY_WEIGHT * yesterday_hits)
    }

    /// Rank entities by weighted score and return the top `n`.
    pub async fn top_popular(&self, n: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let mut weighted: HashMap<String, u64> = HashMap::new();

        for (day, weight) in [(today(), TODAY_WEIGHT), (yesterday(), YESTERDAY_WEIGHT)] {
            let prefix = keys::popularity_day_prefix(day);
            for key in self.store.list(&prefix).await? {
                let Some(entity) = key.strip_prefix(&prefix) else {
                    continue;
                };
                let count: u64 = get_json(self.store.as_ref(), &key).await?.unwrap_or(0);
                *weighted.entry(entity.to_string()).or_default() += weight * count;
            }
        }

        let mut ranked: Vec<(String, u64)> = weighted.into_iter().collect();
        // Ties resolved by entity id so ranking is deterministic.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        Ok(ranked)
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn yesterday() -> Date {
    today().previous_day().unwrap_or_else(today)
}
