//! Cron job that re-warms the product cache for popular entities.

use std::str::FromStr;

use apalis::prelude::{Data, Error as ApalisError};
use apalis_cron::Schedule;

use super::context::JobWorkerContext;

/// Marker struct for the cron-triggered warm-up pass.
#[derive(Default, Debug, Clone)]
pub struct WarmCacheJob;

impl From<chrono::DateTime<chrono::Utc>> for WarmCacheJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_warm_cache_job(
    _job: WarmCacheJob,
    ctx: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    // Warming is best-effort; a failed pass only logs.
    match ctx.warmer.warm().await {
        Ok(warmed) if warmed > 0 => {
            tracing::info!(warmed, "scheduled cache warm complete");
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(error = %err, "scheduled cache warm failed");
        }
    }
    Ok(())
}

pub fn warm_cache_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression)
        .map_err(|err| format!("invalid warm cache cron expression `{expression}`: {err}"))
}
