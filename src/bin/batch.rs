//! One-shot batch runner.
//!
//! Processes a single project from the command line and prints the batch
//! report as JSON, for operators and cron-style scheduling. Exits non-zero
//! when any image failed.

use std::sync::Arc;

use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use docsight::config::AppConfig;
use docsight::db::{self, queries, result_store::PgResultStore};
use docsight::models::project::ProjectStatus;
use docsight::pipeline::descriptor::ConfigBuilder;
use docsight::pipeline::orchestrator::BatchOrchestrator;
use docsight::pipeline::report::BatchReport;
use docsight::pipeline::runner::PipelineRunner;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let Some(project_id) = std::env::args().nth(1).and_then(|arg| arg.parse::<i64>().ok()) else {
        eprintln!("usage: batch <project-id>");
        std::process::exit(2);
    };

    tracing::info!(project_id = %project_id, "Starting docsight batch runner");

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    // Initialize database connection pool
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    match run_project(&pool, &config, project_id).await {
        Ok(report) => {
            let body =
                serde_json::to_string_pretty(&report).expect("Failed to encode batch report");
            println!("{body}");
            std::process::exit(if report.error { 1 } else { 0 });
        }
        Err(e) => {
            tracing::error!(project_id = %project_id, error = %e, "Batch run failed");
            std::process::exit(1);
        }
    }
}

/// Run the full batch for one project, recording status transitions.
async fn run_project(
    pool: &PgPool,
    config: &AppConfig,
    project_id: i64,
) -> Result<BatchReport, Box<dyn std::error::Error>> {
    let project = queries::get_project(pool, project_id)
        .await?
        .ok_or_else(|| format!("project {project_id} not found"))?;
    let images = queries::list_images(pool, project_id).await?;

    let runner = PipelineRunner::from_command_line(&config.pipeline_program, config.job_timeout())
        .ok_or("PIPELINE_PROGRAM must not be empty")?;
    let builder = ConfigBuilder::new(&config.media_root, config.default_model_id);
    let store = Arc::new(PgResultStore::new(pool.clone()));
    let orchestrator = BatchOrchestrator::new(builder, runner, store, config.max_concurrent_jobs);

    queries::update_project_status(pool, project_id, ProjectStatus::Processing).await?;

    let run = orchestrator.run(&project, &images).await;

    let status = match &run {
        Ok(report) if !report.error => ProjectStatus::Completed,
        _ => ProjectStatus::Failed,
    };
    if let Err(e) = queries::update_project_status(pool, project_id, status).await {
        tracing::error!(project_id = %project_id, error = %e, "Failed to record final project status");
    }

    Ok(run?)
}
