use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted outcome of one successful pipeline run, owned one-to-one by the
/// image it was produced from.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResultSet {
    pub id: i64,
    pub image_id: i64,
    pub project_id: i64,
    pub detection: serde_json::Value,
    pub recognition: serde_json::Value,
    pub interpretation: serde_json::Value,
    pub detection_image_path: Option<String>,
    pub recognition_image_path: Option<String>,
    pub interpretation_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper for inserting result sets.
#[derive(Debug, Clone)]
pub struct NewResultSet {
    pub image_id: i64,
    pub project_id: i64,
    pub detection: serde_json::Value,
    pub recognition: serde_json::Value,
    pub interpretation: serde_json::Value,
    pub detection_image_path: Option<String>,
    pub recognition_image_path: Option<String>,
    pub interpretation_image_path: Option<String>,
}
