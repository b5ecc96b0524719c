use std::{process, sync::Arc, time::Duration};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{
        CacheWarmer, InvalidationService, ProductService, SearchService,
        error::AppError,
        jobs::{
            JobWorkerContext, cleanup_schedule, process_cleanup_job, process_refresh_index_job,
            process_warm_cache_job, refresh_index_schedule, warm_cache_schedule,
        },
    },
    cache::{FragmentRegistry, MemoryStore, PopularityTracker, Revalidator},
    catalog::InMemoryCatalog,
    config,
    infra::{error::InfraError, http, telemetry},
    search::index::IndexStore,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

struct ApplicationContext {
    http_state: http::HttpState,
    job_context: JobWorkerContext,
    warmer: Arc<CacheWarmer>,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings);

    // Initial warm pass also builds the index when the store has none.
    match app.warmer.warm().await {
        Ok(warmed) => info!(warmed, "startup cache warm complete"),
        Err(err) => warn!(error = %err, "startup cache warm failed"),
    }

    let monitor_handle = spawn_job_monitor(app.job_context.clone(), &settings.jobs)?;

    let result = serve_http(&settings, app.http_state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

fn build_application_context(settings: &config::Settings) -> ApplicationContext {
    let store = MemoryStore::shared();
    let catalog = InMemoryCatalog::seeded();

    let revalidator = Revalidator::new(store.clone(), settings.cache.stale_threshold);
    let registry = FragmentRegistry::new(store.clone());
    let popularity = Arc::new(PopularityTracker::new(
        store.clone(),
        settings.cache.popularity_retention,
    ));
    let index = IndexStore::new(store.clone(), settings.cache.index_backup_ttl);

    let search = SearchService::new(
        catalog.clone(),
        index,
        revalidator.clone(),
        settings.cache.search_result_ttl,
    );
    let products = ProductService::new(
        catalog,
        revalidator,
        registry.clone(),
        popularity.clone(),
        settings.cache.ttl.clone(),
    );
    let invalidation = InvalidationService::new(registry.clone());
    let warmer = Arc::new(CacheWarmer::new(
        products.clone(),
        search.clone(),
        popularity,
        settings.jobs.warm_top_n.get() as usize,
    ));

    let http_state = http::HttpState {
        search: search.clone(),
        products,
        invalidation,
        api_token: settings.auth.api_token.clone(),
        default_limit: settings.search.default_limit.get(),
        max_limit: settings.search.max_limit.get(),
    };

    let job_context = JobWorkerContext {
        search,
        registry,
        store,
        warmer: warmer.clone(),
    };

    ApplicationContext {
        http_state,
        job_context,
        warmer,
    }
}

fn spawn_job_monitor(
    context: JobWorkerContext,
    jobs: &config::JobsSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let refresh_schedule =
        refresh_index_schedule(&jobs.refresh_index_cron).map_err(AppError::unexpected)?;
    let warm_schedule = warm_cache_schedule(&jobs.warm_cache_cron).map_err(AppError::unexpected)?;
    let sweep_schedule = cleanup_schedule(&jobs.cleanup_cron).map_err(AppError::unexpected)?;

    let refresh_index_worker = WorkerBuilder::new("refresh-index-worker")
        .data(context.clone())
        .backend(CronStream::new(refresh_schedule))
        .build_fn(process_refresh_index_job);
    let warm_cache_worker = WorkerBuilder::new("warm-cache-worker")
        .data(context.clone())
        .backend(CronStream::new(warm_schedule))
        .build_fn(process_warm_cache_job);
    let cleanup_worker = WorkerBuilder::new("cleanup-worker")
        .data(context)
        .backend(CronStream::new(sweep_schedule))
        .build_fn(process_cleanup_job);

    let monitor = Monitor::new()
        .register(refresh_index_worker)
        .register(warm_cache_worker)
        .register(cleanup_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: http::HttpState,
) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "edge API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(grace_secs = grace.as_secs(), "shutdown signal received");

    // In-flight requests get the configured window before the process is
    // forced down.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("graceful shutdown window elapsed, forcing exit");
        process::exit(0);
    });
}
