use std::collections::HashSet;
use std::sync::Mutex;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info};

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::project::ProjectStatus;
use crate::pipeline::orchestrator::BatchError;
use crate::pipeline::report::BatchReport;

/// POST /api/v1/projects/{id}/process — run the pipeline over every image.
///
/// Synchronous: the response carries the full per-image breakdown and total
/// processing time in seconds. `200` when every image succeeded, `500` when
/// at least one failed, `409` while another run on the same project is in
/// flight, `422` when the project has no model.
pub async fn process_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<(StatusCode, Json<BatchReport>), StatusCode> {
    let project = queries::get_project(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "project fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let _guard =
        RunGuard::acquire(&state.runs_in_flight, project_id).ok_or(StatusCode::CONFLICT)?;

    let images = queries::list_images(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "image listing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    set_status(&state, project_id, ProjectStatus::Processing).await;
    info!(project_id = %project_id, images = images.len(), "processing requested");

    match state.orchestrator.run(&project, &images).await {
        Ok(report) => {
            let status = if report.error {
                ProjectStatus::Failed
            } else {
                ProjectStatus::Completed
            };
            set_status(&state, project_id, status).await;

            let code = if report.error {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            Ok((code, Json(report)))
        }
        Err(BatchError::NoModelConfigured(_)) => {
            set_status(&state, project_id, ProjectStatus::Failed).await;
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e @ BatchError::Purge { .. }) => {
            error!(project_id = %project_id, error = %e, "batch run aborted");
            set_status(&state, project_id, ProjectStatus::Failed).await;
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn set_status(state: &AppState, project_id: i64, status: ProjectStatus) {
    if let Err(e) = queries::update_project_status(&state.db, project_id, status).await {
        error!(project_id = %project_id, error = %e, "status update failed");
    }
}

/// Single-flight marker for one project's batch run, released on drop so an
/// early return cannot leave the project stuck.
struct RunGuard<'a> {
    runs: &'a Mutex<HashSet<i64>>,
    project_id: i64,
}

impl<'a> RunGuard<'a> {
    fn acquire(runs: &'a Mutex<HashSet<i64>>, project_id: i64) -> Option<Self> {
        let mut in_flight = runs.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(project_id) {
            return None;
        }
        Some(Self { runs, project_id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_guard_rejects_second_acquire_until_dropped() {
        let runs = Mutex::new(HashSet::new());

        let first = RunGuard::acquire(&runs, 5).unwrap();
        assert!(RunGuard::acquire(&runs, 5).is_none());
        // A different project is unaffected.
        assert!(RunGuard::acquire(&runs, 6).is_some());

        drop(first);
        assert!(RunGuard::acquire(&runs, 5).is_some());
    }
}
