pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::HttpState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

/// Build the edge API router. Mutating routes sit behind the bearer-token
/// gate; read routes and the health probe stay open.
pub fn build_router(state: HttpState) -> Router {
    let auth_state = state.clone();

    let mutating = Router::new()
        .route("/index/update", post(handlers::update_index))
        .route("/cache/invalidate", post(handlers::invalidate))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ));

    Router::new()
        .route("/search", get(handlers::search))
        .route("/suggest", get(handlers::suggest))
        .route("/product-data/{id_or_slug}", get(handlers::product_data))
        .route("/healthz", get(handlers::healthz))
        .merge(mutating)
        .with_state(state)
}
