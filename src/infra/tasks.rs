use std::future::Future;

use tracing::warn;

/// Spawn a fire-and-forget background task.
///
/// Failures are logged and dropped; callers must not depend on the task
/// completing before their own response is sent.
pub fn detach<F, E>(name: &'static str, fut: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display,
{
    tokio::spawn(async move {
        if let Err(err) = fut.await {
            warn!(task = name, error = %err, "detached task failed");
        }
    });
}
