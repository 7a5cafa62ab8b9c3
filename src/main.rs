mod app_state;
mod config;
mod db;
mod models;
mod pipeline;
mod routes;
mod services;

use axum::{routing::delete, routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use db::result_store::PgResultStore;
use pipeline::descriptor::ConfigBuilder;
use pipeline::orchestrator::BatchOrchestrator;
use pipeline::runner::PipelineRunner;
use services::storage::LocalStorage;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing docsight server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "docsight_batch_duration_seconds",
        "Wall-clock time of one project batch run"
    );
    metrics::describe_counter!(
        "docsight_images_processed_total",
        "Images processed successfully across all batch runs"
    );
    metrics::describe_counter!(
        "docsight_images_failed_total",
        "Images that failed processing across all batch runs"
    );
    metrics::describe_counter!("docsight_uploads_total", "Images accepted for upload");

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Prepare the media root for uploads and pipeline output
    tokio::fs::create_dir_all(&config.media_root)
        .await
        .expect("Failed to create media root directory");
    let storage = LocalStorage::new(&config.media_root);

    // Assemble the batch orchestrator
    let runner = PipelineRunner::from_command_line(&config.pipeline_program, config.job_timeout())
        .expect("PIPELINE_PROGRAM must not be empty");
    let builder = ConfigBuilder::new(&config.media_root, config.default_model_id);
    let store = Arc::new(PgResultStore::new(db_pool.clone()));
    let orchestrator =
        BatchOrchestrator::new(builder, runner, store, config.max_concurrent_jobs);

    // Create shared application state
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db_pool, config, storage, orchestrator);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/v1/models",
            post(routes::models::create_model).get(routes::models::list_models),
        )
        .route(
            "/api/v1/projects",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/api/v1/projects/{project_id}",
            get(routes::projects::get_project).delete(routes::projects::delete_project),
        )
        .route(
            "/api/v1/projects/{project_id}/images",
            post(routes::images::upload_images).get(routes::images::list_images),
        )
        .route(
            "/api/v1/projects/{project_id}/process",
            post(routes::process::process_project),
        )
        .route("/api/v1/images/{image_id}", delete(routes::images::delete_image))
        .route(
            "/api/v1/images/{image_id}/results",
            get(routes::images::get_image_results),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(50 * 1024 * 1024)); // 50 MB, uploads arrive in batches

    tracing::info!("Starting docsight on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
