use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;
use vetrina_api_types::{
    IndexUpdateRequest, IndexUpdateResponse, InvalidateRequest, InvalidateResponse,
    ProductDataResponse, SearchResponse, SuggestResponse,
};

use crate::application::SearchParams;
use crate::search::query::{Filters, SortOrder};

use super::error::ApiError;
use super::state::HttpState;

/// Search parameters, all taken as raw strings so a malformed value is
/// treated as absent instead of failing the whole request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default, alias = "query", alias = "term")]
    pub q: String,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default, alias = "query", alias = "term")]
    pub q: String,
    pub limit: Option<String>,
}

/// Parse a query value, dropping anything empty or malformed.
fn lenient<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct ProductDataQuery {
    pub locale: Option<String>,
}

pub async fn search(
    State(state): State<HttpState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let sort = query.sort.as_deref().map(str::trim).and_then(|raw| {
        match SortOrder::from_str(raw) {
            Ok(sort) => Some(sort),
            Err(_) => {
                if !raw.is_empty() {
                    debug!(sort = raw, "ignoring unknown sort order");
                }
                None
            }
        }
    });

    let page = lenient::<u32>(query.page.as_deref()).unwrap_or(1).max(1);
    let limit = lenient::<u32>(query.limit.as_deref())
        .unwrap_or(state.default_limit)
        .clamp(1, state.max_limit);

    let params = SearchParams {
        term: query.q,
        page,
        limit,
        sort,
        filters: Filters {
            category: query.category,
            min_price: lenient::<f64>(query.min_price.as_deref()),
            max_price: lenient::<f64>(query.max_price.as_deref()),
        },
    };

    let response = state.search.search(params).await?;
    Ok(Json(response))
}

pub async fn suggest(
    State(state): State<HttpState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let limit = lenient::<u32>(query.limit.as_deref());
    let response = state.search.suggest(&query.q, limit).await?;
    Ok(Json(response))
}

pub async fn update_index(
    State(state): State<HttpState>,
    Json(request): Json<IndexUpdateRequest>,
) -> Result<Json<IndexUpdateResponse>, ApiError> {
    let response = state.search.update_index(request).await?;
    Ok(Json(response))
}

pub async fn invalidate(
    State(state): State<HttpState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let response = state.invalidation.invalidate(request).await?;
    Ok(Json(response))
}

pub async fn product_data(
    State(state): State<HttpState>,
    Path(id_or_slug): Path<String>,
    Query(query): Query<ProductDataQuery>,
) -> Result<Json<ProductDataResponse>, ApiError> {
    let response = state
        .products
        .product_data(&id_or_slug, query.locale.as_deref())
        .await?;
    Ok(Json(response))
}

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}
