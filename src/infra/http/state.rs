use crate::application::{InvalidationService, ProductService, SearchService};

/// Shared state for the edge API router.
#[derive(Clone)]
pub struct HttpState {
    pub search: SearchService,
    pub products: ProductService,
    pub invalidation: InvalidationService,
    /// Bearer token protecting the mutating endpoints; `None` leaves them
    /// open (local development only).
    pub api_token: Option<String>,
    pub default_limit: u32,
    pub max_limit: u32,
}
