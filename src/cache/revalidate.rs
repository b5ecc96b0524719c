//! Stale-while-revalidate read path.
//!
//! A hit past its stale threshold is still served; the caller is told it
//! was stale and is expected to submit a detached refresh. There is no
//! single-flight suppression: concurrent requests that each observe the
//! same stale entry each dispatch their own refresh. The refresh is a
//! last-writer-wins overwrite, so the race only costs duplicate work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::debug;

use super::entry::{CacheEntry, Freshness};
use super::store::{CacheStore, PutOptions, StoreError, get_json, put_json};

/// Result of a revalidating read.
#[derive(Debug)]
pub enum CacheRead<T> {
    Fresh(T),
    /// Servable, but the caller should dispatch a background refresh.
    Stale(T),
    Miss,
}

impl<T> CacheRead<T> {
    pub fn value(self) -> Option<T> {
        match self {
            CacheRead::Fresh(value) | CacheRead::Stale(value) => Some(value),
            CacheRead::Miss => None,
        }
    }
}

#[derive(Clone)]
pub struct Revalidator {
    store: Arc<dyn CacheStore>,
    stale_threshold: f64,
}

impl Revalidator {
    pub fn new(store: Arc<dyn CacheStore>, stale_threshold: f64) -> Self {
        Self {
            store,
            stale_threshold,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Read `key`, classifying the hit by age.
    ///
    /// Entries past their TTL are treated as misses even if the store has
    /// not reaped them yet.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<CacheRead<T>, StoreError> {
        let entry: Option<CacheEntry<T>> = get_json(self.store.as_ref(), key).await?;
        let Some(entry) = entry else {
            counter!("vetrina_cache_miss_total").increment(1);
            return Ok(CacheRead::Miss);
        };

        let now = OffsetDateTime::now_utc();
        match entry.freshness(now) {
            Freshness::Fresh => {
                counter!("vetrina_cache_hit_total").increment(1);
                Ok(CacheRead::Fresh(entry.value))
            }
            Freshness::Stale => {
                counter!("vetrina_cache_stale_hit_total").increment(1);
                debug!(key, age_secs = entry.age(now).as_secs(), "serving stale entry");
                Ok(CacheRead::Stale(entry.value))
            }
            Freshness::Expired => {
                counter!("vetrina_cache_miss_total").increment(1);
                Ok(CacheRead::Miss)
            }
        }
    }

    /// Write `value` under `key` with the given lifetime.
    ///
    /// The store-enforced TTL matches the envelope TTL, so the entry
    /// disappears at the same moment it would classify as expired.
    pub async fn write<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        tags: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry::new(value, ttl, self.stale_threshold).with_tags(tags.clone());
        put_json(
            self.store.as_ref(),
            key,
            &entry,
            PutOptions {
                ttl: Some(ttl),
                metadata: tags,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::MemoryStore;

    use super::*;

    fn revalidator(store: Arc<MemoryStore>) -> Revalidator {
        Revalidator::new(store, 0.75)
    }

    #[tokio::test]
    async fn miss_then_fresh_hit() {
        let store = MemoryStore::shared();
        let cache = revalidator(store);

        let read: CacheRead<String> = cache.read("k").await.expect("read");
        assert!(matches!(read, CacheRead::Miss));

        cache
            .write("k", &"value".to_string(), Duration::from_secs(60), HashMap::new())
            .await
            .expect("write");

        let read: CacheRead<String> = cache.read("k").await.expect("read");
        assert!(matches!(read, CacheRead::Fresh(v) if v == "value"));
    }

    #[tokio::test]
    async fn aged_entry_reads_stale() {
        let store = MemoryStore::shared();
        let cache = revalidator(store.clone());

        // Write an envelope whose created_at is already past the threshold.
        let mut entry = CacheEntry::new("old".to_string(), Duration::from_secs(100), 0.75);
        entry.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(80);
        put_json(store.as_ref(), "k", &entry, PutOptions::default())
            .await
            .expect("seed");

        let read: CacheRead<String> = cache.read("k").await.expect("read");
        assert!(matches!(read, CacheRead::Stale(v) if v == "old"));
    }

    #[tokio::test]
    async fn overwrite_resets_freshness() {
        let store = MemoryStore::shared();
        let cache = revalidator(store.clone());

        let mut entry = CacheEntry::new("old".to_string(), Duration::from_secs(100), 0.75);
        entry.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(80);
        put_json(store.as_ref(), "k", &entry, PutOptions::default())
            .await
            .expect("seed");

        cache
            .write("k", &"new".to_string(), Duration::from_secs(100), HashMap::new())
            .await
            .expect("refresh");

        let read: CacheRead<String> = cache.read("k").await.expect("read");
        assert!(matches!(read, CacheRead::Fresh(v) if v == "new"));
    }

    #[tokio::test]
    async fn envelope_past_ttl_is_a_miss() {
        let store = MemoryStore::shared();
        let cache = revalidator(store.clone());

        let mut entry = CacheEntry::new("dead".to_string(), Duration::from_secs(10), 0.75);
        entry.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(30);
        put_json(store.as_ref(), "k", &entry, PutOptions::default())
            .await
            .expect("seed");

        let read: CacheRead<String> = cache.read("k").await.expect("read");
        assert!(matches!(read, CacheRead::Miss));
    }
}
