use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of a project's most recent processing run.
///
/// Stored uppercase in the database, snake_case on the wire. The processing
/// route owns every transition; the orchestrator only reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A customer's batch of images analyzed together with one chosen model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub model_id: Option<i64>,
    pub image_total: i64,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a project.
///
/// An absent `model_id` is filled in with the configured default at creation
/// time; a project can still end up model-less if its model is later deleted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(skip)]
    pub model_id: Option<i64>,
}
