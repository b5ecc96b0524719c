//! Invalidation requests mapped onto registry selectors.

use std::str::FromStr;

use metrics::counter;
use tracing::{info, warn};
use vetrina_api_types::{InvalidateRequest, InvalidateResponse};

use crate::cache::{FragmentRegistry, InvalidationSelector};
use crate::domain::fragment::FragmentKind;

use super::error::AppError;

#[derive(Clone)]
pub struct InvalidationService {
    registry: FragmentRegistry,
}

impl InvalidationService {
    pub fn new(registry: FragmentRegistry) -> Self {
        Self { registry }
    }

    /// Apply an invalidation request.
    ///
    /// Product and category ids select by fragment id; tags carrying known
    /// fragment kind names select by kind. Unknown tags are skipped with a
    /// warning rather than failing the whole request. An empty request is
    /// a successful no-op.
    pub async fn invalidate(
        &self,
        request: InvalidateRequest,
    ) -> Result<InvalidateResponse, AppError> {
        let mut ids = request.product_ids;
        ids.extend(request.category_ids);

        let mut kinds = Vec::new();
        for tag in &request.tags {
            match FragmentKind::from_str(tag) {
                Ok(kind) => kinds.push(kind),
                Err(_) => warn!(tag = %tag, "ignoring unknown fragment tag"),
            }
        }

        let selector = InvalidationSelector {
            ids,
            kinds,
            versions: None,
        };

        if selector.is_empty() {
            return Ok(InvalidateResponse {
                success: true,
                invalidated: 0,
            });
        }

        let outcome = self.registry.invalidate(&selector).await?;
        counter!("vetrina_cache_invalidate_total").increment(outcome.removed as u64);
        info!(
            removed = outcome.removed,
            failed = outcome.failed_deletes,
            "invalidation applied"
        );

        Ok(InvalidateResponse {
            success: true,
            invalidated: outcome.removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::{CacheStore, MemoryStore, PutOptions, keys};
    use crate::domain::fragment::FragmentKey;

    use super::*;

    async fn seeded_registry(store: Arc<MemoryStore>) -> FragmentRegistry {
        let registry = FragmentRegistry::new(store.clone());
        for (id, kind) in [
            ("p-1", FragmentKind::ProductCard),
            ("p-2", FragmentKind::ProductCard),
            ("footer", FragmentKind::Footer),
        ] {
            let key = FragmentKey::new(id, "v1", "default");
            let cache_key = keys::product_key(id);
            store
                .put(&cache_key, "{}".to_string(), PutOptions::default())
                .await
                .expect("seed cache entry");
            registry
                .upsert(key, kind, cache_key, Duration::from_secs(60))
                .await
                .expect("seed registry");
        }
        registry
    }

    #[tokio::test]
    async fn empty_request_is_a_noop() {
        let store = MemoryStore::shared();
        let service = InvalidationService::new(seeded_registry(store).await);
        let outcome = service
            .invalidate(InvalidateRequest::default())
            .await
            .expect("invalidate");
        assert!(outcome.success);
        assert_eq!(outcome.invalidated, 0);
    }

    #[tokio::test]
    async fn product_ids_remove_their_fragments_only() {
        let store = MemoryStore::shared();
        let service = InvalidationService::new(seeded_registry(store.clone()).await);

        let outcome = service
            .invalidate(InvalidateRequest {
                product_ids: vec!["p-1".into()],
                ..Default::default()
            })
            .await
            .expect("invalidate");
        assert_eq!(outcome.invalidated, 1);
        assert!(store
            .get(&keys::product_key("p-1"))
            .await
            .expect("read")
            .is_none());
        assert!(store
            .get(&keys::product_key("p-2"))
            .await
            .expect("read")
            .is_some());
    }

    #[tokio::test]
    async fn kind_tags_sweep_all_fragments_of_that_kind() {
        let store = MemoryStore::shared();
        let service = InvalidationService::new(seeded_registry(store.clone()).await);

        let outcome = service
            .invalidate(InvalidateRequest {
                tags: vec!["product-card".into(), "not-a-kind".into()],
                ..Default::default()
            })
            .await
            .expect("invalidate");
        assert_eq!(outcome.invalidated, 2);
        assert!(store
            .get(&keys::product_key("footer"))
            .await
            .expect("read")
            .is_some());
    }
}
