//! Read-only catalog collaborator.
//!
//! The canonical product/category store is owned elsewhere; this module
//! only defines the read seam the cache and search services depend on,
//! plus an in-memory implementation used in development and tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::product::ProductRecord;
use crate::search::seed;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog store unreachable: {0}")]
    Unreachable(String),
}

/// Read-only access to canonical catalog records.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look a product up by id or slug.
    async fn product(&self, id_or_slug: &str) -> Result<Option<ProductRecord>, CatalogError>;
    /// Snapshot of every product, used for index rebuilds and the
    /// direct-scan fallback.
    async fn all_products(&self) -> Result<Vec<ProductRecord>, CatalogError>;
    /// Distinct non-empty category names.
    async fn categories(&self) -> Result<BTreeSet<String>, CatalogError>;
    /// Distinct non-empty vendor names.
    async fn brands(&self) -> Result<BTreeSet<String>, CatalogError>;
}

/// In-memory catalog, seeded or fed through `replace`.
pub struct InMemoryCatalog {
    products: RwLock<Vec<ProductRecord>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    pub fn seeded() -> Arc<Self> {
        Arc::new(Self::new(seed::seed_products().to_vec()))
    }

    /// Replace the whole product set (feed import).
    pub async fn replace(&self, products: Vec<ProductRecord>) {
        *self.products.write().await = products;
    }

    /// Merge products by id, keeping others untouched.
    pub async fn merge(&self, incoming: Vec<ProductRecord>) {
        let mut products = self.products.write().await;
        for product in incoming {
            match products.iter_mut().find(|p| p.id == product.id) {
                Some(slot) => *slot = product,
                None => products.push(product),
            }
        }
    }

}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn product(&self, id_or_slug: &str) -> Result<Option<ProductRecord>, CatalogError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.id == id_or_slug || p.slug == id_or_slug)
            .cloned())
    }

    async fn all_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
        Ok(self.products.read().await.clone())
    }

    async fn categories(&self) -> Result<BTreeSet<String>, CatalogError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect())
    }

    async fn brands(&self) -> Result<BTreeSet<String>, CatalogError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .map(|p| p.vendor.clone())
            .filter(|v| !v.is_empty())
            .collect())
    }
}
