//! Product data served through the stale-while-revalidate cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use vetrina_api_types::{ProductDataResponse, ProductPayload};

use crate::cache::{
    CacheRead, FragmentRegistry, PopularityTracker, Revalidator, TtlPolicy, keys,
};
use crate::catalog::CatalogStore;
use crate::domain::error::DomainError;
use crate::domain::fragment::{FragmentKey, FragmentKind};
use crate::infra::tasks;

use super::error::AppError;

const DEFAULT_LOCALE: &str = "default";
const FRAGMENT_VERSION: &str = "v1";

#[derive(Clone)]
pub struct ProductService {
    catalog: Arc<dyn CatalogStore>,
    revalidator: Revalidator,
    registry: FragmentRegistry,
    popularity: Arc<PopularityTracker>,
    ttl: TtlPolicy,
}

impl ProductService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        revalidator: Revalidator,
        registry: FragmentRegistry,
        popularity: Arc<PopularityTracker>,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            catalog,
            revalidator,
            registry,
            popularity,
            ttl,
        }
    }

    /// Serve a product payload, preferring the cache.
    ///
    /// A stale hit is still served and a detached refresh is dispatched.
    /// Every successful serve counts one popularity hit for the product.
    pub async fn product_data(
        &self,
        id_or_slug: &str,
        locale: Option<&str>,
    ) -> Result<ProductDataResponse, AppError> {
        let cache_key = keys::product_key(id_or_slug);

        match self.revalidator.read::<ProductPayload>(&cache_key).await {
            Ok(CacheRead::Fresh(payload)) => {
                self.record_hit_detached(&payload.id);
                return Ok(ProductDataResponse {
                    success: true,
                    product: payload,
                });
            }
            Ok(CacheRead::Stale(payload)) => {
                self.record_hit_detached(&payload.id);
                let service = self.clone();
                let lookup = id_or_slug.to_string();
                let locale = locale.unwrap_or(DEFAULT_LOCALE).to_string();
                tasks::detach("product-refresh", async move {
                    service.refresh(&lookup, &locale).await.map(|_| ())
                });
                return Ok(ProductDataResponse {
                    success: true,
                    product: payload,
                });
            }
            Ok(CacheRead::Miss) => {}
            Err(err) => {
                warn!(key = %cache_key, error = %err, "product cache read failed");
            }
        }

        let payload = self
            .refresh(id_or_slug, locale.unwrap_or(DEFAULT_LOCALE))
            .await?;
        self.record_hit_detached(&payload.id);
        Ok(ProductDataResponse {
            success: true,
            product: payload,
        })
    }

    /// Load the product from the catalog, cache it under a policy-derived
    /// TTL and register its fragment record.
    pub async fn refresh(&self, id_or_slug: &str, locale: &str) -> Result<ProductPayload, AppError> {
        let record = self
            .catalog
            .product(id_or_slug)
            .await?
            .ok_or_else(|| AppError::Domain(DomainError::not_found("product")))?;

        let popularity = self.popularity.score(&record.id).await?;
        let ttl = self.ttl.ttl_for(popularity, record.flags);
        let payload = record.to_payload();

        let cache_key = keys::product_key(id_or_slug);
        let mut tags = HashMap::new();
        tags.insert("productId".to_string(), record.id.clone());
        if !record.category.is_empty() {
            tags.insert("category".to_string(), record.category.clone());
        }
        self.revalidator.write(&cache_key, &payload, ttl, tags).await?;

        let fragment_key = FragmentKey::new(
            record.id.clone(),
            FRAGMENT_VERSION.to_string(),
            locale.to_string(),
        );
        self.registry
            .upsert(fragment_key, FragmentKind::ProductCard, cache_key, ttl)
            .await?;

        Ok(payload)
    }

    fn record_hit_detached(&self, product_id: &str) {
        let popularity = self.popularity.clone();
        let id = product_id.to_string();
        tasks::detach("popularity-hit", async move {
            popularity.record_hit(&id).await
        });
    }
}
