mod cleanup;
mod context;
mod refresh_index;
mod warm_cache;

pub use cleanup::{CleanupJob, cleanup_schedule, process_cleanup_job};
pub use context::JobWorkerContext;
pub use refresh_index::{RefreshIndexJob, process_refresh_index_job, refresh_index_schedule};
pub use warm_cache::{WarmCacheJob, process_warm_cache_job, warm_cache_schedule};
