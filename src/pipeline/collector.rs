use thiserror::Error;
use tracing::debug;

use super::descriptor::{JobDescriptor, Stage};
use super::report::{FailureReason, PerImageResult, StageArtifacts};

/// Why one image's artifacts could not be collected.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("missing {stage} results at {path}")]
    Missing { stage: Stage, path: String },

    #[error("unreadable {stage} results: {source}")]
    Unreadable {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {stage} results: {source}")]
    Malformed {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
}

impl CollectError {
    fn reason(&self) -> FailureReason {
        match self {
            CollectError::Missing { .. } | CollectError::Unreadable { .. } => {
                FailureReason::IncompleteArtifacts
            }
            CollectError::Malformed { .. } => FailureReason::MalformedArtifact,
        }
    }
}

/// Gather one image's artifacts after a successful pipeline run.
///
/// All three stage results are required atomically; partial output is a
/// failure, not a success with holes. Annotated images are supplementary
/// and degrade to `None` paths when absent.
pub async fn collect(descriptor: &JobDescriptor) -> PerImageResult {
    match read_stages(descriptor).await {
        Ok(artifacts) => PerImageResult::succeeded(
            descriptor.image_id,
            descriptor.image_file_name.clone(),
            artifacts,
        ),
        Err(e) => PerImageResult::failed(
            descriptor.image_id,
            descriptor.image_file_name.clone(),
            e.reason(),
            e.to_string(),
        ),
    }
}

async fn read_stages(descriptor: &JobDescriptor) -> Result<StageArtifacts, CollectError> {
    // Every stage must have produced results before any is parsed.
    for stage in Stage::ALL {
        let path = descriptor.stage_results_path(stage);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CollectError::Missing {
                stage,
                path: path.display().to_string(),
            });
        }
    }

    let detection = parse_stage(descriptor, Stage::Detection).await?;
    let recognition = parse_stage(descriptor, Stage::Recognition).await?;
    let interpretation = parse_stage(descriptor, Stage::Interpretation).await?;

    Ok(StageArtifacts {
        detection,
        recognition,
        interpretation,
        detection_image_path: visual_rel(descriptor, Stage::Detection).await,
        recognition_image_path: visual_rel(descriptor, Stage::Recognition).await,
        interpretation_image_path: visual_rel(descriptor, Stage::Interpretation).await,
    })
}

async fn parse_stage(
    descriptor: &JobDescriptor,
    stage: Stage,
) -> Result<serde_json::Value, CollectError> {
    let path = descriptor.stage_results_path(stage);
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|source| CollectError::Unreadable { stage, source })?;
    serde_json::from_slice(&raw).map_err(|source| CollectError::Malformed { stage, source })
}

async fn visual_rel(descriptor: &JobDescriptor, stage: Stage) -> Option<String> {
    let path = descriptor.stage_visual_path(stage);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        Some(descriptor.stage_visual_rel(stage))
    } else {
        debug!(
            image = %descriptor.image_file_name,
            stage = %stage,
            "no annotated image produced"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::report::FailureReason;
    use std::path::Path;

    fn descriptor(root: &Path) -> JobDescriptor {
        JobDescriptor {
            project_id: 2,
            image_id: 11,
            image_file_name: "page.png".to_string(),
            model_id: 1,
            input_path: root.join("project_2/page.png"),
            output_dir: root.join("outputs/project_2/page"),
            output_prefix: "outputs/project_2/page".to_string(),
        }
    }

    async fn write_stage(d: &JobDescriptor, stage: Stage, body: &str) {
        let path = d.stage_results_path(stage);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, body).await.unwrap();
    }

    async fn write_visual(d: &JobDescriptor, stage: Stage) {
        let path = d.stage_visual_path(stage);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, b"png bytes").await.unwrap();
    }

    #[tokio::test]
    async fn full_artifact_tree_collects_successfully() {
        let root = tempfile::tempdir().unwrap();
        let d = descriptor(root.path());
        write_stage(&d, Stage::Detection, r#"{"boxes": [1, 2]}"#).await;
        write_stage(&d, Stage::Recognition, r#"{"text": "hello"}"#).await;
        write_stage(&d, Stage::Interpretation, r#"{"fields": {}}"#).await;
        write_visual(&d, Stage::Detection).await;

        let result = collect(&d).await;

        assert!(result.success);
        let artifacts = result.artifacts.unwrap();
        assert_eq!(artifacts.detection["boxes"][0], 1);
        assert_eq!(
            artifacts.detection_image_path.as_deref(),
            Some("outputs/project_2/page/detection/final/visual/page.png")
        );
        // Only detection produced a visual; the others degrade to None.
        assert!(artifacts.recognition_image_path.is_none());
        assert!(artifacts.interpretation_image_path.is_none());
    }

    #[tokio::test]
    async fn missing_stage_is_incomplete_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let d = descriptor(root.path());
        write_stage(&d, Stage::Detection, "{}").await;
        write_stage(&d, Stage::Recognition, "{}").await;
        // interpretation deliberately absent

        let result = collect(&d).await;

        assert!(!result.success);
        let failure = result.failure.unwrap();
        assert_eq!(failure.reason, FailureReason::IncompleteArtifacts);
        assert!(failure.message.contains("interpretation"), "{}", failure.message);
    }

    #[tokio::test]
    async fn unparsable_stage_names_the_culprit() {
        let root = tempfile::tempdir().unwrap();
        let d = descriptor(root.path());
        write_stage(&d, Stage::Detection, "{}").await;
        write_stage(&d, Stage::Recognition, "not json at all").await;
        write_stage(&d, Stage::Interpretation, "{}").await;

        let result = collect(&d).await;

        assert!(!result.success);
        let failure = result.failure.unwrap();
        assert_eq!(failure.reason, FailureReason::MalformedArtifact);
        assert!(failure.message.contains("recognition"), "{}", failure.message);
    }

    #[tokio::test]
    async fn empty_output_dir_is_incomplete_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let d = descriptor(root.path());

        let result = collect(&d).await;

        assert!(!result.success);
        assert_eq!(
            result.failure.unwrap().reason,
            FailureReason::IncompleteArtifacts
        );
    }
}
