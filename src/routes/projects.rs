use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use tracing::{error, warn};

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::project::{CreateProject, Project};

/// POST /api/v1/projects — create a project.
///
/// An absent `model_id` silently falls back to the configured default; if
/// there is no default either, the project is created model-less and the
/// processing endpoint will refuse it.
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), StatusCode> {
    payload
        .validate()
        .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;

    let model_id = payload.model_id.or(state.config.default_model_id);

    match queries::create_project(&state.db, &payload.name, model_id).await {
        Ok(project) => Ok((StatusCode::CREATED, Json(project))),
        Err(e) if is_foreign_key_violation(&e) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        Err(e) => {
            error!(error = %e, "project creation failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/v1/projects — list projects.
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, StatusCode> {
    let projects = queries::list_projects(&state.db).await.map_err(|e| {
        error!(error = %e, "project listing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(projects))
}

/// GET /api/v1/projects/{id} — fetch one project with status and counts.
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Project>, StatusCode> {
    let project = queries::get_project(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "project fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    project.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// DELETE /api/v1/projects/{id} — delete a project and its images.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let deleted = queries::delete_project(&state.db, project_id)
        .await
        .map_err(|e| {
            error!(project_id = %project_id, error = %e, "project deletion failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }

    // Rows are gone; stored files and pipeline outputs are best-effort cleanup.
    if let Err(e) = state.storage.delete_project_dir(project_id).await {
        warn!(project_id = %project_id, error = %e, "project media cleanup failed");
    }
    if let Err(e) = state.orchestrator.discard_project_outputs(project_id).await {
        warn!(project_id = %project_id, error = %e, "project output cleanup failed");
    }

    Ok(StatusCode::NO_CONTENT)
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}
