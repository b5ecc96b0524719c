use std::sync::Arc;

use crate::application::search_service::SearchService;
use crate::application::warmup::CacheWarmer;
use crate::cache::{FragmentRegistry, MemoryStore};

/// Shared context passed to job workers so they can reach the services
/// they drive.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub search: SearchService,
    pub registry: FragmentRegistry,
    pub store: Arc<MemoryStore>,
    pub warmer: Arc<CacheWarmer>,
}
