//! Cron job that sweeps expired fragment records out of the registry.

use std::str::FromStr;

use apalis::prelude::{Data, Error as ApalisError};
use apalis_cron::Schedule;

use super::context::JobWorkerContext;

/// Marker struct for the cron-triggered registry sweep.
#[derive(Default, Debug, Clone)]
pub struct CleanupJob;

impl From<chrono::DateTime<chrono::Utc>> for CleanupJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_cleanup_job(
    _job: CleanupJob,
    ctx: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    let purged = ctx.store.purge_expired();
    if purged > 0 {
        tracing::info!(purged, "reaped expired store entries");
    }

    match ctx.registry.sweep_expired().await {
        Ok(outcome) if outcome.removed > 0 => {
            tracing::info!(
                removed = outcome.removed,
                failed = outcome.failed_deletes,
                "swept expired fragment records"
            );
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(error = %err, "registry sweep failed");
        }
    }
    Ok(())
}

pub fn cleanup_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression)
        .map_err(|err| format!("invalid cleanup cron expression `{expression}`: {err}"))
}
