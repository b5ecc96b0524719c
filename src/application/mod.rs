//! Application services orchestrating cache, catalog and search.

pub mod error;
pub mod invalidation;
pub mod jobs;
pub mod product_service;
pub mod search_service;
pub mod warmup;

pub use error::AppError;
pub use invalidation::InvalidationService;
pub use product_service::ProductService;
pub use search_service::{SearchParams, SearchService};
pub use warmup::CacheWarmer;
