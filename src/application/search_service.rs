//! Search orchestration: cached query execution, suggestions and index
//! maintenance.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};
use vetrina_api_types::{
    IndexUpdateRequest, IndexUpdateResponse, Pagination, PriceRange, SearchFilters,
    SearchProduct, SearchResponse, SuggestResponse,
};

use crate::cache::{CacheRead, Revalidator, keys};
use crate::catalog::{CatalogStore, InMemoryCatalog};
use crate::domain::product::ProductRecord;
use crate::domain::search::SearchDocument;
use crate::infra::tasks;
use crate::search::index::{IndexSnapshot, IndexStore};
use crate::search::{query, seed, suggest};

use super::error::AppError;

/// One parsed search request, already clamped to servable bounds.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub term: String,
    pub page: u32,
    pub limit: u32,
    pub sort: Option<query::SortOrder>,
    pub filters: query::Filters,
}

#[derive(Clone)]
pub struct SearchService {
    catalog: Arc<InMemoryCatalog>,
    index: IndexStore,
    revalidator: Revalidator,
    result_ttl: Duration,
}

impl SearchService {
    pub fn new(
        catalog: Arc<InMemoryCatalog>,
        index: IndexStore,
        revalidator: Revalidator,
        result_ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            index,
            revalidator,
            result_ttl,
        }
    }

    /// Serve a search request, preferring the cached response for the same
    /// normalized parameters. A stale cached response is still served; the
    /// recompute happens on a detached task.
    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse, AppError> {
        counter!("vetrina_search_query_total").increment(1);

        let term = params.term.trim().to_lowercase();
        if term.is_empty() {
            // Browse state: no results, but the filter block still
            // advertises the catalog-wide facets.
            let mut response = SearchResponse::empty(params.page, params.limit);
            response.filters = self.catalog_facets().await?;
            return Ok(response);
        }

        let cache_key = result_cache_key(&params);
        match self.revalidator.read::<SearchResponse>(&cache_key).await {
            Ok(CacheRead::Fresh(response)) => return Ok(response),
            Ok(CacheRead::Stale(response)) => {
                let service = self.clone();
                let stale_params = params.clone();
                tasks::detach("search-result-refresh", async move {
                    service.compute_and_cache(&stale_params).await.map(|_| ())
                });
                return Ok(response);
            }
            Ok(CacheRead::Miss) => {}
            Err(err) => {
                // A broken result cache must not take search down.
                warn!(key = %cache_key, error = %err, "search result cache read failed");
            }
        }

        self.compute_and_cache(&params).await
    }

    /// Autocomplete phrases for a partial query.
    pub async fn suggest(
        &self,
        query_text: &str,
        limit: Option<u32>,
    ) -> Result<SuggestResponse, AppError> {
        let trimmed = query_text.trim();
        if trimmed.chars().count() < 2 {
            return Ok(SuggestResponse {
                success: true,
                suggestions: Vec::new(),
            });
        }
        let limit = limit
            .map(|l| (l as usize).clamp(1, suggest::AUTOCOMPLETE_LIMIT))
            .unwrap_or(suggest::AUTOCOMPLETE_LIMIT);

        // Candidates come from the best-matching documents, not the whole
        // corpus, so phrase ranking tracks query relevance.
        let snapshot = self.snapshot().await?;
        let matched = query::execute(&snapshot, &trimmed.to_lowercase());
        let documents: Vec<&SearchDocument> = matched
            .iter()
            .take(suggest::CANDIDATE_POOL_SIZE)
            .map(|scored| &scored.doc)
            .collect();
        let mut suggestions = suggest::autocomplete(&documents, trimmed);
        suggestions.truncate(limit);
        Ok(SuggestResponse {
            success: true,
            suggestions,
        })
    }

    /// Apply a product feed to the index: either merge by id or replace the
    /// whole document set.
    pub async fn update_index(
        &self,
        request: IndexUpdateRequest,
    ) -> Result<IndexUpdateResponse, AppError> {
        let records: Vec<ProductRecord> = request
            .products
            .into_iter()
            .map(ProductRecord::from_payload)
            .filter(|record| {
                if record.id.is_empty() {
                    warn!("skipping feed entry without an id");
                    return false;
                }
                true
            })
            .collect();

        if records.is_empty() {
            return Err(AppError::validation("feed contains no usable products"));
        }

        let documents: Vec<SearchDocument> =
            records.iter().map(SearchDocument::from_record).collect();
        let indexed = documents.len();

        if request.incremental {
            self.catalog.merge(records).await;
            self.index.upsert(documents).await?;
        } else {
            self.catalog.replace(records).await;
            self.rebuild_with_metrics(documents).await?;
        }

        self.flush_result_cache().await;

        Ok(IndexUpdateResponse {
            success: true,
            products_indexed: indexed,
            incremental: request.incremental,
        })
    }

    /// Rebuild the index from the current catalog contents. Used by the
    /// scheduled refresh and at startup when no snapshot exists yet.
    pub async fn refresh_from_catalog(&self) -> Result<usize, AppError> {
        let mut products = self.catalog.all_products().await?;
        if products.is_empty() {
            counter!("vetrina_search_fallback_total").increment(1);
            products = seed::seed_products().to_vec();
        }

        let documents: Vec<SearchDocument> =
            products.iter().map(SearchDocument::from_record).collect();
        let indexed = documents.len();
        self.rebuild_with_metrics(documents).await?;
        self.flush_result_cache().await;
        Ok(indexed)
    }

    /// Whether the store holds a current index snapshot.
    pub async fn has_snapshot(&self) -> Result<bool, AppError> {
        Ok(self.index.load().await?.is_some())
    }

    async fn rebuild_with_metrics(
        &self,
        documents: Vec<SearchDocument>,
    ) -> Result<IndexSnapshot, AppError> {
        let started = std::time::Instant::now();
        let snapshot = self.index.rebuild(documents).await?;
        counter!("vetrina_index_rebuild_total").increment(1);
        histogram!("vetrina_index_rebuild_ms").record(started.elapsed().as_millis() as f64);
        Ok(snapshot)
    }

    async fn compute_and_cache(&self, params: &SearchParams) -> Result<SearchResponse, AppError> {
        let snapshot = self.snapshot().await?;
        let term = params.term.trim().to_lowercase();

        let matched = query::execute(&snapshot, &term);

        let suggestions = if suggest::should_attempt_spelling(&term, matched.len()) {
            suggest::spelling_correction(&term, &snapshot.documents)
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };

        let filtered = query::apply_filters(matched, &params.filters);
        let filters = facets(&filtered);

        let mut ordered = filtered;
        query::apply_sort(&mut ordered, params.sort);

        let (total, page_items) = query::paginate(ordered, params.page, params.limit);
        let products = page_items
            .into_iter()
            .map(|scored| SearchProduct {
                id: scored.doc.id,
                slug: scored.doc.slug,
                name: scored.doc.name,
                description: scored.doc.description,
                category: scored.doc.category,
                vendor: scored.doc.vendor,
                price: scored.doc.price,
                score: scored.score,
                matched_fields: scored
                    .matched_fields
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
            })
            .collect();

        let response = SearchResponse {
            success: true,
            products,
            pagination: Pagination::compute(total, params.page, params.limit),
            filters,
            suggestions,
        };

        let cache_key = result_cache_key(params);
        if let Err(err) = self
            .revalidator
            .write(&cache_key, &response, self.result_ttl, Default::default())
            .await
        {
            warn!(key = %cache_key, error = %err, "failed to cache search response");
        }

        Ok(response)
    }

    /// Catalog-wide facets, used when there is no result set to derive
    /// them from.
    async fn catalog_facets(&self) -> Result<SearchFilters, AppError> {
        Ok(SearchFilters {
            categories: self.catalog.categories().await?.into_iter().collect(),
            price_range: PriceRange { min: 0.0, max: 0.0 },
            brands: self.catalog.brands().await?.into_iter().collect(),
        })
    }

    /// Current snapshot, rebuilt from the catalog (or the static seed set)
    /// when the store holds none.
    async fn snapshot(&self) -> Result<IndexSnapshot, AppError> {
        if let Some(snapshot) = self.index.load().await? {
            return Ok(snapshot);
        }

        counter!("vetrina_search_fallback_total").increment(1);
        let mut products = self.catalog.all_products().await?;
        if products.is_empty() {
            products = seed::seed_products().to_vec();
        }
        info!(products = products.len(), "no index snapshot found, rebuilding");
        let documents = products.iter().map(SearchDocument::from_record).collect();
        Ok(self.rebuild_with_metrics(documents).await?)
    }

    /// Cached responses are derived from the index; drop them whenever the
    /// index changes. Best effort.
    async fn flush_result_cache(&self) {
        let store = self.revalidator.store();
        let keys = match store.list(keys::SEARCH_RESULT_PREFIX).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "failed to list cached search results");
                return;
            }
        };
        for key in &keys {
            if let Err(err) = store.delete(key).await {
                warn!(key = %key, error = %err, "failed to drop cached search result");
            }
        }
        debug!(dropped = keys.len(), "flushed search result cache");
    }
}

/// Facets computed over the filtered result set, before pagination.
fn facets(results: &[query::ScoredDoc]) -> SearchFilters {
    let categories: BTreeSet<String> = results
        .iter()
        .map(|r| r.doc.category.clone())
        .filter(|c| !c.is_empty())
        .collect();
    let brands: BTreeSet<String> = results
        .iter()
        .map(|r| r.doc.vendor.clone())
        .filter(|v| !v.is_empty())
        .collect();

    let price_range = results
        .iter()
        .map(|r| r.doc.price)
        .fold(None::<PriceRange>, |acc, price| {
            Some(match acc {
                None => PriceRange {
                    min: price,
                    max: price,
                },
                Some(range) => PriceRange {
                    min: range.min.min(price),
                    max: range.max.max(price),
                },
            })
        })
        .unwrap_or(PriceRange { min: 0.0, max: 0.0 });

    SearchFilters {
        categories: categories.into_iter().collect(),
        price_range,
        brands: brands.into_iter().collect(),
    }
}

/// Stable cache key over the normalized request parameters.
fn result_cache_key(params: &SearchParams) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        params.term.trim().to_lowercase(),
        params.filters.category.as_deref().unwrap_or(""),
        params
            .filters
            .min_price
            .map(|p| p.to_string())
            .unwrap_or_default(),
        params
            .filters
            .max_price
            .map(|p| p.to_string())
            .unwrap_or_default(),
        params.sort.map(|s| s.as_str()).unwrap_or(""),
        params.page,
        params.limit,
    );
    keys::search_result_key(keys::hash_value(&canonical))
}

#[cfg(test)]
mod tests {
    use crate::cache::{CacheStore, MemoryStore};
    use crate::search::query::{Filters, SortOrder};

    use super::*;

    fn service(store: Arc<MemoryStore>) -> SearchService {
        SearchService::new(
            InMemoryCatalog::seeded(),
            IndexStore::new(store.clone(), Duration::from_secs(300)),
            Revalidator::new(store, 0.75),
            Duration::from_secs(60),
        )
    }

    fn params(term: &str) -> SearchParams {
        SearchParams {
            term: term.to_string(),
            page: 1,
            limit: 20,
            sort: None,
            filters: Filters::default(),
        }
    }

    #[tokio::test]
    async fn empty_term_yields_wellformed_empty_response() {
        let service = service(MemoryStore::shared());
        let response = service.search(params("   ")).await.expect("search");
        assert!(response.success);
        assert!(response.products.is_empty());
        assert_eq!(response.pagination.total, 0);
        // Browse state still advertises what can be filtered on.
        assert!(!response.filters.categories.is_empty());
        assert!(!response.filters.brands.is_empty());
    }

    #[tokio::test]
    async fn seeded_catalog_serves_results_without_prior_index() {
        let service = service(MemoryStore::shared());
        let response = service.search(params("kit")).await.expect("search");
        assert!(!response.products.is_empty());
        assert!(response.products[0].name.contains("Kit"));
        assert!(!response.filters.categories.is_empty());
    }

    #[tokio::test]
    async fn suggestions_are_drawn_from_matching_documents_only() {
        let service = service(MemoryStore::shared());

        let response = service.suggest("kit", None).await.expect("suggest");
        assert!(!response.suggestions.is_empty());
        for phrase in &response.suggestions {
            assert!(phrase.contains("kit"));
        }

        // A query no document contains yields no phrases at all.
        let nothing = service.suggest("zzyzx", None).await.expect("suggest");
        assert!(nothing.suggestions.is_empty());
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let store = MemoryStore::shared();
        let service = service(store.clone());

        let first = service.search(params("kit")).await.expect("search");
        let keys = store.list(keys::SEARCH_RESULT_PREFIX).await.expect("list");
        assert_eq!(keys.len(), 1);

        let second = service.search(params("kit")).await.expect("search");
        assert_eq!(
            first.products.len(),
            second.products.len(),
        );
    }

    #[tokio::test]
    async fn full_feed_replaces_documents_and_flushes_results() {
        let store = MemoryStore::shared();
        let service = service(store.clone());

        // Prime a cached result against the seed set.
        service.search(params("kit")).await.expect("search");
        assert!(!store.list(keys::SEARCH_RESULT_PREFIX).await.expect("list").is_empty());

        let feed = IndexUpdateRequest {
            products: vec![vetrina_api_types::ProductPayload {
                id: "feed-1".into(),
                slug: Some("cadeira-alta".into()),
                name: Some("Cadeira Alta de Alimentação".into()),
                ..Default::default()
            }],
            incremental: false,
        };
        let outcome = service.update_index(feed).await.expect("update");
        assert_eq!(outcome.products_indexed, 1);
        assert!(!outcome.incremental);

        assert!(store.list(keys::SEARCH_RESULT_PREFIX).await.expect("list").is_empty());

        let response = service.search(params("cadeira")).await.expect("search");
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.products[0].id, "feed-1");
        // The old seed set is gone after a full replacement.
        let gone = service.search(params("enxoval")).await.expect("search");
        assert!(gone.products.is_empty());
    }

    #[tokio::test]
    async fn incremental_feed_keeps_existing_documents() {
        let service = service(MemoryStore::shared());
        service.refresh_from_catalog().await.expect("refresh");

        let feed = IndexUpdateRequest {
            products: vec![vetrina_api_types::ProductPayload {
                id: "feed-2".into(),
                name: Some("Trocador Portátil".into()),
                ..Default::default()
            }],
            incremental: true,
        };
        service.update_index(feed).await.expect("update");

        let new_hit = service.search(params("trocador")).await.expect("search");
        assert_eq!(new_hit.products.len(), 1);
        let old_hit = service.search(params("kit")).await.expect("search");
        assert!(!old_hit.products.is_empty());
    }

    #[tokio::test]
    async fn thin_results_for_long_terms_carry_spelling_suggestion() {
        let service = service(MemoryStore::shared());
        let response = service
            .search(params("montessorian"))
            .await
            .expect("search");
        assert!(
            response.products.len() >= 3 || !response.suggestions.is_empty(),
            "either results or a correction must come back"
        );
    }

    #[tokio::test]
    async fn sort_and_filters_flow_through() {
        let service = service(MemoryStore::shared());
        let mut p = params("kit");
        p.sort = Some(SortOrder::PriceDesc);
        let response = service.search(p).await.expect("search");
        let prices: Vec<f64> = response.products.iter().map(|p| p.price).collect();
        let mut sorted = prices.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(prices, sorted);
    }
}
