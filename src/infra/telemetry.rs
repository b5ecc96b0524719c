use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vetrina_cache_hit_total",
            Unit::Count,
            "Total number of fresh cache hits."
        );
        describe_counter!(
            "vetrina_cache_stale_hit_total",
            Unit::Count,
            "Total number of stale cache hits served while a refresh runs."
        );
        describe_counter!(
            "vetrina_cache_miss_total",
            Unit::Count,
            "Total number of cache misses."
        );
        describe_counter!(
            "vetrina_cache_invalidate_total",
            Unit::Count,
            "Total number of fragment records removed by invalidation."
        );
        describe_counter!(
            "vetrina_search_query_total",
            Unit::Count,
            "Total number of search queries served."
        );
        describe_counter!(
            "vetrina_search_fallback_total",
            Unit::Count,
            "Total number of search queries answered from a fallback source."
        );
        describe_counter!(
            "vetrina_index_rebuild_total",
            Unit::Count,
            "Total number of full index rebuilds."
        );
        describe_histogram!(
            "vetrina_index_rebuild_ms",
            Unit::Milliseconds,
            "Full index rebuild latency in milliseconds."
        );
        describe_histogram!(
            "vetrina_cache_warm_ms",
            Unit::Milliseconds,
            "Cache warm phase latency in milliseconds."
        );
    });
}
