use serde::{Deserialize, Serialize};

/// Why one image's processing attempt failed.
///
/// Reason codes are part of the API response surface; variant names are
/// serialized verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    PipelineFailure,
    Timeout,
    IncompleteArtifacts,
    MalformedArtifact,
    PersistenceFailure,
}

/// A failed attempt: reason code plus operator-readable detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFailure {
    pub reason: FailureReason,
    pub message: String,
}

/// Parsed artifacts of one successful pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageArtifacts {
    pub detection: serde_json::Value,
    pub recognition: serde_json::Value,
    pub interpretation: serde_json::Value,
    pub detection_image_path: Option<String>,
    pub recognition_image_path: Option<String>,
    pub interpretation_image_path: Option<String>,
}

/// Outcome of one image's run attempt.
///
/// Exactly one of `artifacts` / `failure` is set, matching `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerImageResult {
    pub image_id: i64,
    pub image_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<StageArtifacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ImageFailure>,
}

impl PerImageResult {
    pub fn succeeded(image_id: i64, image_name: String, artifacts: StageArtifacts) -> Self {
        Self {
            image_id,
            image_name,
            success: true,
            artifacts: Some(artifacts),
            failure: None,
        }
    }

    pub fn failed(
        image_id: i64,
        image_name: String,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            image_id,
            image_name,
            success: false,
            artifacts: None,
            failure: Some(ImageFailure {
                reason,
                message: message.into(),
            }),
        }
    }
}

/// Aggregated outcome of one orchestration pass over a project.
///
/// Pure return value; the caller derives the project status from it and maps
/// it onto the HTTP response.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub project_id: i64,
    pub model_id: i64,
    /// True iff at least one image failed, for any reason.
    pub error: bool,
    pub successful: Vec<PerImageResult>,
    pub failed: Vec<PerImageResult>,
    /// Wall-clock seconds for the whole run.
    pub total_processing_time: f64,
}
