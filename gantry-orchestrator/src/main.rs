use anyhow::Context;
use gantry_core::domain::dataset::DatasetSource;
use gantry_orchestrator::api::{self, AppState};
use gantry_orchestrator::catalogue::ModelCatalogue;
use gantry_orchestrator::config::Config;
use gantry_orchestrator::db;
use gantry_orchestrator::service::{
    ArtifactStore, NotificationEmitter, Orchestrator, PipelineController,
};
use gantry_runner::{FileIngestor, JobRunner};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gantry_orchestrator=debug,gantry_runner=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gantry Orchestrator...");

    let config = Config::from_env()?;
    config.validate()?;

    let catalogue = ModelCatalogue::from_file(&config.catalogue_path, &config.work_dir)
        .with_context(|| {
            format!(
                "Failed to load model catalogue from {}",
                config.catalogue_path.display()
            )
        })?;
    tracing::info!("Loaded {} models from catalogue", catalogue.len());

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    tokio::fs::create_dir_all(&config.blob_dir)
        .await
        .context("Failed to create blob directory")?;

    let store = Arc::new(ArtifactStore::new(pool.clone(), &config.blob_dir));
    let emitter = NotificationEmitter::new(pool.clone());
    let orchestrator = Orchestrator::new(
        pool.clone(),
        store.clone(),
        emitter.clone(),
        JobRunner::new(config.job_timeout),
        config.max_parallel_jobs,
    );
    let controller =
        PipelineController::new(Arc::new(FileIngestor::new()), orchestrator, emitter.clone());

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        pool,
        catalogue: Arc::new(catalogue),
        store,
        emitter,
        controller,
        dataset_source: DatasetSource::new(config.dataset_source.clone()),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
