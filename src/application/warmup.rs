//! Startup and scheduled cache warm-up.

use std::sync::Arc;

use metrics::histogram;
use tracing::{info, warn};

use crate::cache::PopularityTracker;

use super::error::AppError;
use super::product_service::ProductService;
use super::search_service::SearchService;

const DEFAULT_LOCALE: &str = "default";

pub struct CacheWarmer {
    products: ProductService,
    search: SearchService,
    popularity: Arc<PopularityTracker>,
    top_n: usize,
}

impl CacheWarmer {
    pub fn new(
        products: ProductService,
        search: SearchService,
        popularity: Arc<PopularityTracker>,
        top_n: usize,
    ) -> Self {
        Self {
            products,
            search,
            popularity,
            top_n,
        }
    }

    /// Warm the product cache for the currently most popular entities and
    /// make sure an index snapshot exists.
    ///
    /// Individual products failing to warm is tolerated; the pass reports
    /// how many actually landed.
    pub async fn warm(&self) -> Result<usize, AppError> {
        let started = std::time::Instant::now();

        let ranked = self.popularity.top_popular(self.top_n).await?;
        let mut warmed = 0;
        for (id, weight) in &ranked {
            match self.products.refresh(id, DEFAULT_LOCALE).await {
                Ok(_) => warmed += 1,
                Err(err) => {
                    warn!(product = %id, weight, error = %err, "failed to warm product");
                }
            }
        }

        // An index rebuild is only forced when no snapshot exists yet;
        // refreshes between cron runs are handled by the refresh job.
        if self.search.has_snapshot().await? {
            info!(warmed, candidates = ranked.len(), "cache warm pass complete");
        } else {
            let indexed = self.search.refresh_from_catalog().await?;
            info!(
                warmed,
                candidates = ranked.len(),
                indexed,
                "cache warm pass built the initial index"
            );
        }

        histogram!("vetrina_cache_warm_ms").record(started.elapsed().as_millis() as f64);
        Ok(warmed)
    }
}
