//! Durable fragment registry.
//!
//! Tracks the identity of every cached fragment (id, version, locale)
//! together with the cache key it guards, enabling selective invalidation
//! and expiry sweeps. Records live in the durable store under the
//! `fragment-registry:` prefix; nothing is held in process memory.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::fragment::{FragmentKey, FragmentKind, FragmentRecord};

use super::keys;
use super::store::{CacheStore, PutOptions, StoreError, get_json, put_json};

/// Which records an invalidation targets.
///
/// A record matches when its id is in `ids` OR its kind is in `kinds`.
/// When `versions` is given, the record's version must additionally be
/// listed, or the list must contain the wildcard `"all"`.
#[derive(Debug, Clone, Default)]
pub struct InvalidationSelector {
    pub ids: Vec<String>,
    pub kinds: Vec<FragmentKind>,
    pub versions: Option<Vec<String>>,
}

impl InvalidationSelector {
    pub fn for_ids(ids: Vec<String>) -> Self {
        Self {
            ids,
            ..Default::default()
        }
    }

    pub fn for_kinds(kinds: Vec<FragmentKind>) -> Self {
        Self {
            kinds,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.kinds.is_empty()
    }

    fn matches(&self, record: &FragmentRecord) -> bool {
        let identity = self.ids.iter().any(|id| *id == record.key.id)
            || self.kinds.contains(&record.kind);
        if !identity {
            return false;
        }
        match &self.versions {
            Some(versions) => versions
                .iter()
                .any(|v| v == "all" || *v == record.key.version),
            None => true,
        }
    }
}

/// Aggregate result of a best-effort invalidation or sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidationOutcome {
    /// Registry records removed.
    pub removed: usize,
    /// Cache entry deletions that failed and were skipped over.
    pub failed_deletes: usize,
}

#[derive(Clone)]
pub struct FragmentRegistry {
    store: Arc<dyn CacheStore>,
}

impl FragmentRegistry {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Insert or replace the record at the composite key.
    pub async fn upsert(
        &self,
        key: FragmentKey,
        kind: FragmentKind,
        cache_key: String,
        ttl: Duration,
    ) -> Result<FragmentRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let record_key = keys::registry_key(&key);

        let existing: Option<FragmentRecord> =
            get_json(self.store.as_ref(), &record_key).await?;
        let record = FragmentRecord {
            key,
            kind,
            cache_key,
            created_at: existing.map(|r| r.created_at).unwrap_or(now),
            updated_at: now,
            expires_at: now + ttl,
        };

        put_json(
            self.store.as_ref(),
            &record_key,
            &record,
            PutOptions::default(),
        )
        .await?;
        Ok(record)
    }

    pub async fn get(&self, key: &FragmentKey) -> Result<Option<FragmentRecord>, StoreError> {
        get_json(self.store.as_ref(), &keys::registry_key(key)).await
    }

    /// Delete every matching record's cache entry, then prune the records.
    ///
    /// Best effort per key: one failed cache delete is logged and skipped,
    /// the rest of the batch continues. Calling this twice with the same
    /// selector is a no-op the second time.
    pub async fn invalidate(
        &self,
        selector: &InvalidationSelector,
    ) -> Result<InvalidationOutcome, StoreError> {
        if selector.is_empty() {
            return Ok(InvalidationOutcome::default());
        }

        let mut outcome = InvalidationOutcome::default();
        for record in self.all_records().await? {
            if !selector.matches(&record) {
                continue;
            }
            self.remove_record(&record, &mut outcome).await;
        }

        debug!(
            removed = outcome.removed,
            failed = outcome.failed_deletes,
            "fragment invalidation completed"
        );
        Ok(outcome)
    }

    /// Remove every record whose `expires_at` has passed, along with its
    /// backing cache entry.
    pub async fn sweep_expired(&self) -> Result<InvalidationOutcome, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut outcome = InvalidationOutcome::default();
        for record in self.all_records().await? {
            if record.expires_at >= now {
                continue;
            }
            self.remove_record(&record, &mut outcome).await;
        }
        Ok(outcome)
    }

    pub async fn all_records(&self) -> Result<Vec<FragmentRecord>, StoreError> {
        let mut records = Vec::new();
        for key in self.store.list(keys::REGISTRY_PREFIX).await? {
            // A record that fails to decode is skipped, not fatal; it will
            // be overwritten by the next upsert for its composite key.
            match get_json::<FragmentRecord>(self.store.as_ref(), &key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    warn!(key, error = %err, "skipping undecodable registry record");
                }
            }
        }
        Ok(records)
    }

    async fn remove_record(&self, record: &FragmentRecord, outcome: &mut InvalidationOutcome) {
        if let Err(err) = self.store.delete(&record.cache_key).await {
            warn!(
                cache_key = record.cache_key,
                error = %err,
                "failed to delete cache entry during invalidation"
            );
            outcome.failed_deletes += 1;
        }
        let record_key = keys::registry_key(&record.key);
        match self.store.delete(&record_key).await {
            Ok(()) => outcome.removed += 1,
            Err(err) => {
                warn!(record_key, error = %err, "failed to prune registry record");
                outcome.failed_deletes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{MemoryStore, PutOptions};

    use super::*;

    async fn seed_fragment(
        registry: &FragmentRegistry,
        store: &MemoryStore,
        id: &str,
        kind: FragmentKind,
    ) -> FragmentKey {
        let key = FragmentKey::new(id, "v1", "en");
        let cache_key = keys::fragment_key(&key);
        store
            .put(&cache_key, "<html>".to_string(), PutOptions::default())
            .await
            .expect("cache entry");
        registry
            .upsert(key.clone(), kind, cache_key, Duration::from_secs(3600))
            .await
            .expect("upsert");
        key
    }

    #[tokio::test]
    async fn upsert_replaces_at_composite_key() {
        let store = MemoryStore::shared();
        let registry = FragmentRegistry::new(store.clone());

        let key = FragmentKey::new("p-1", "v1", "en");
        let first = registry
            .upsert(
                key.clone(),
                FragmentKind::ProductCard,
                "fragment:p-1:v1:en".into(),
                Duration::from_secs(60),
            )
            .await
            .expect("first upsert");
        let second = registry
            .upsert(
                key.clone(),
                FragmentKind::ProductCard,
                "fragment:p-1:v1:en".into(),
                Duration::from_secs(60),
            )
            .await
            .expect("second upsert");

        // created_at survives the replace, no duplicate record appears.
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(registry.all_records().await.expect("records").len(), 1);
    }

    #[tokio::test]
    async fn invalidate_by_kind_spares_other_kinds() {
        let store = MemoryStore::shared();
        let registry = FragmentRegistry::new(store.clone());

        let card = seed_fragment(&registry, &store, "p-1", FragmentKind::ProductCard).await;
        let footer = seed_fragment(&registry, &store, "site", FragmentKind::Footer).await;

        let outcome = registry
            .invalidate(&InvalidationSelector::for_kinds(vec![
                FragmentKind::ProductCard,
            ]))
            .await
            .expect("invalidate");

        assert_eq!(outcome.removed, 1);
        assert!(store.get(&keys::fragment_key(&card)).await.unwrap().is_none());
        assert!(store.get(&keys::fragment_key(&footer)).await.unwrap().is_some());
        assert!(registry.get(&footer).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn second_identical_invalidate_is_noop() {
        let store = MemoryStore::shared();
        let registry = FragmentRegistry::new(store.clone());
        seed_fragment(&registry, &store, "p-1", FragmentKind::ProductCard).await;

        let selector = InvalidationSelector::for_ids(vec!["p-1".to_string()]);
        let first = registry.invalidate(&selector).await.expect("first");
        let second = registry.invalidate(&selector).await.expect("second");

        assert_eq!(first.removed, 1);
        assert_eq!(second.removed, 0);
    }

    #[tokio::test]
    async fn version_filter_requires_listed_or_wildcard() {
        let store = MemoryStore::shared();
        let registry = FragmentRegistry::new(store.clone());
        seed_fragment(&registry, &store, "p-1", FragmentKind::ProductCard).await;

        let miss = InvalidationSelector {
            ids: vec!["p-1".to_string()],
            kinds: Vec::new(),
            versions: Some(vec!["v2".to_string()]),
        };
        assert_eq!(registry.invalidate(&miss).await.expect("miss").removed, 0);

        let wildcard = InvalidationSelector {
            ids: vec!["p-1".to_string()],
            kinds: Vec::new(),
            versions: Some(vec!["all".to_string()]),
        };
        assert_eq!(
            registry.invalidate(&wildcard).await.expect("hit").removed,
            1
        );
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_records() {
        let store = MemoryStore::shared();
        let registry = FragmentRegistry::new(store.clone());

        let expired = seed_fragment(&registry, &store, "old", FragmentKind::Banner).await;
        // Rewind its expiry.
        let record_key = keys::registry_key(&expired);
        let mut record: FragmentRecord = get_json(store.as_ref(), &record_key)
            .await
            .expect("get")
            .expect("record");
        record.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(5);
        put_json(store.as_ref(), &record_key, &record, PutOptions::default())
            .await
            .expect("rewind");

        seed_fragment(&registry, &store, "fresh", FragmentKind::Banner).await;

        let outcome = registry.sweep_expired().await.expect("sweep");
        assert_eq!(outcome.removed, 1);
        assert_eq!(registry.all_records().await.expect("records").len(), 1);
    }
}
