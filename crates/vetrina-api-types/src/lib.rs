//! Request and response types for the Vetrina HTTP API.
//!
//! All wire field names are camelCase; consumers of the edge endpoints
//! (storefront client, CDN workers) expect that casing.

use serde::{Deserialize, Serialize};

/// Raw product payload as supplied by the catalog feed.
///
/// Several text fields have historical alternates (`short_description` for
/// `description`, `brand` for `vendor`, `category_name` for `category`).
/// The server resolves them in a fixed priority order; both spellings are
/// accepted on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default)]
    pub limited_stock: bool,
}

/// A scored search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProduct {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub price: f64,
    /// Relevance score normalized into `[0, 10]`.
    pub score: f64,
    /// Which document fields matched the query.
    pub matched_fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Derive page bookkeeping from a total count and a 1-based page request.
    pub fn compute(total: u64, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit as u64) as u32;
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Facets derived from the result set before pagination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub categories: Vec<String>,
    pub price_range: PriceRange,
    pub brands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub products: Vec<SearchProduct>,
    pub pagination: Pagination,
    pub filters: SearchFilters,
    /// Spelling corrections offered when the result set is thin.
    pub suggestions: Vec<String>,
}

impl SearchResponse {
    /// The well-formed empty response returned for degenerate queries.
    pub fn empty(page: u32, limit: u32) -> Self {
        Self {
            success: true,
            products: Vec::new(),
            pagination: Pagination::compute(0, page, limit),
            filters: SearchFilters::default(),
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub success: bool,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexUpdateRequest {
    pub products: Vec<ProductPayload>,
    #[serde(default)]
    pub incremental: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexUpdateResponse {
    pub success: bool,
    pub products_indexed: usize,
    pub incremental: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    /// Fragment kind names ("product-card", "footer", ...) or the
    /// wildcard-bearing version list.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub success: bool,
    /// How many registry records (and their cache entries) were removed.
    pub invalidated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDataResponse {
    pub success: bool,
    pub product: ProductPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}
