//! Cron job that rebuilds the search index from the catalog.

use std::str::FromStr;

use apalis::prelude::{Data, Error as ApalisError};
use apalis_cron::Schedule;

use super::context::JobWorkerContext;

/// Marker struct for the cron-triggered index refresh.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron
/// compatibility.
#[derive(Default, Debug, Clone)]
pub struct RefreshIndexJob;

impl From<chrono::DateTime<chrono::Utc>> for RefreshIndexJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

/// Process one refresh tick: full rebuild from the current catalog.
pub async fn process_refresh_index_job(
    _job: RefreshIndexJob,
    ctx: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    match ctx.search.refresh_from_catalog().await {
        Ok(indexed) => {
            tracing::info!(indexed, "scheduled index refresh complete");
        }
        Err(err) => {
            tracing::warn!(error = %err, "scheduled index refresh failed");
        }
    }
    Ok(())
}

/// Parse the configured cron cadence for the refresh worker.
pub fn refresh_index_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression)
        .map_err(|err| format!("invalid refresh index cron expression `{expression}`: {err}"))
}
