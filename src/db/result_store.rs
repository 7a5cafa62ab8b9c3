use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::result_set::NewResultSet;

/// Errors persisting result sets.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image {0} already has a result set")]
    Duplicate(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable home for per-image pipeline results.
///
/// One result set per image; the uniqueness invariant lives here, not in
/// the orchestrator.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist one successful image outcome.
    async fn create_result_set(&self, new: NewResultSet) -> Result<(), StoreError>;
}

/// Postgres-backed result store.
#[derive(Debug, Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn create_result_set(&self, new: NewResultSet) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO result_sets
                (image_id, project_id, detection, recognition, interpretation,
                 detection_image_path, recognition_image_path, interpretation_image_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(new.image_id)
        .bind(new.project_id)
        .bind(&new.detection)
        .bind(&new.recognition)
        .bind(&new.interpretation)
        .bind(&new.detection_image_path)
        .bind(&new.recognition_image_path)
        .bind(&new.interpretation_image_path)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(new.image_id)),
            Err(e) => Err(StoreError::Database(e)),
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
