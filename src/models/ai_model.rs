use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// A registered AI model configuration that projects can select.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiModel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a model.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModel {
    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(length(max = 1000))]
    pub description: Option<String>,
}
