use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use tracing::error;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::ai_model::{AiModel, CreateModel};

/// POST /api/v1/models — register an AI model configuration.
pub async fn create_model(
    State(state): State<AppState>,
    Json(payload): Json<CreateModel>,
) -> Result<(StatusCode, Json<AiModel>), StatusCode> {
    payload
        .validate()
        .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;

    match queries::create_model(&state.db, &payload.name, payload.description.as_deref()).await {
        Ok(model) => Ok((StatusCode::CREATED, Json(model))),
        Err(e) if is_unique_violation(&e) => Err(StatusCode::CONFLICT),
        Err(e) => {
            error!(error = %e, "model registration failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/v1/models — list registered models.
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<AiModel>>, StatusCode> {
    let models = queries::list_models(&state.db).await.map_err(|e| {
        error!(error = %e, "model listing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(models))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
