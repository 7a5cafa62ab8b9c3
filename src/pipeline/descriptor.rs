use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::models::image::ImageKind;

/// Processing stages the pipeline runs per image, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Detection,
    Recognition,
    Interpretation,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Detection, Stage::Recognition, Stage::Interpretation];
}

/// Errors building a job descriptor.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid image name {0:?}")]
    InvalidImageName(String),

    #[error("no model requested and no default model configured")]
    NoDefaultModel,

    #[error("descriptor artifact write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("descriptor artifact encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Self-contained description of one image's processing task.
///
/// Serialized to `<output_dir>/job.json` for the external pipeline to
/// consume. Constructed fresh per run, never persisted, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub project_id: i64,
    pub image_id: i64,
    pub image_file_name: String,
    pub model_id: i64,
    /// Absolute path of the uploaded image the pipeline reads.
    pub input_path: PathBuf,
    /// Absolute directory the pipeline writes its artifacts under.
    pub output_dir: PathBuf,
    /// Media-root-relative mirror of `output_dir`, recorded in persisted
    /// annotated-image paths.
    pub output_prefix: String,
}

impl JobDescriptor {
    /// Path of the descriptor artifact handed to the pipeline.
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join("job.json")
    }

    /// Where a stage must leave its structured results.
    pub fn stage_results_path(&self, stage: Stage) -> PathBuf {
        self.output_dir
            .join(stage.to_string())
            .join("final")
            .join("results.json")
    }

    /// Where a stage may leave its annotated image.
    pub fn stage_visual_path(&self, stage: Stage) -> PathBuf {
        self.output_dir
            .join(stage.to_string())
            .join("final")
            .join("visual")
            .join(&self.image_file_name)
    }

    /// Relative annotated-image path as persisted in a result set.
    pub fn stage_visual_rel(&self, stage: Stage) -> String {
        format!(
            "{}/{}/final/visual/{}",
            self.output_prefix, stage, self.image_file_name
        )
    }
}

/// Builds job descriptors and materializes their artifacts.
///
/// Owns the pipeline path layout together with the collector; nothing else
/// assembles artifact paths by hand. The default model id is injected here
/// at construction instead of living in process-wide state.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    media_root: PathBuf,
    default_model_id: Option<i64>,
}

impl ConfigBuilder {
    pub fn new(media_root: impl Into<PathBuf>, default_model_id: Option<i64>) -> Self {
        Self {
            media_root: media_root.into(),
            default_model_id,
        }
    }

    /// Resolve the effective model for a request, falling back to the
    /// configured default.
    pub fn resolve_model(&self, requested: Option<i64>) -> Result<i64, ConfigError> {
        requested
            .or(self.default_model_id)
            .ok_or(ConfigError::NoDefaultModel)
    }

    /// Root of one project's output tree, purged before every run.
    pub fn project_output_dir(&self, project_id: i64) -> PathBuf {
        self.media_root
            .join("outputs")
            .join(format!("project_{project_id}"))
    }

    /// Remove one project's output tree. Absence is not an error.
    pub async fn discard_project_outputs(&self, project_id: i64) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(self.project_output_dir(project_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Build the descriptor for one image and write its `job.json` artifact.
    ///
    /// Creates the output directory; the artifact and that directory are the
    /// only filesystem effects.
    pub async fn build(
        &self,
        project_id: i64,
        image_id: i64,
        image_file_name: &str,
        model_id: Option<i64>,
    ) -> Result<JobDescriptor, ConfigError> {
        let base = image_base_name(image_file_name)?;
        let model_id = self.resolve_model(model_id)?;

        let descriptor = JobDescriptor {
            project_id,
            image_id,
            image_file_name: image_file_name.to_string(),
            model_id,
            input_path: self
                .media_root
                .join(format!("project_{project_id}"))
                .join(image_file_name),
            output_dir: self.project_output_dir(project_id).join(&base),
            output_prefix: format!("outputs/project_{project_id}/{base}"),
        };

        tokio::fs::create_dir_all(&descriptor.output_dir).await?;
        let body = serde_json::to_vec_pretty(&descriptor)?;
        tokio::fs::write(descriptor.artifact_path(), body).await?;

        Ok(descriptor)
    }
}

/// Validate the file name and strip its extension.
fn image_base_name(name: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidImageName(name.to_string());
    let (base, ext) = name.rsplit_once('.').ok_or_else(invalid)?;
    // A base of "." or ".." would point the output dir at the tree above it.
    if base.is_empty()
        || base == "."
        || base == ".."
        || base.contains(['/', '\\'])
        || ImageKind::from_extension(ext).is_none()
    {
        return Err(invalid());
    }
    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder {
        ConfigBuilder::new("/srv/media", Some(3))
    }

    fn descriptor() -> JobDescriptor {
        JobDescriptor {
            project_id: 12,
            image_id: 5,
            image_file_name: "scan_01.png".to_string(),
            model_id: 3,
            input_path: "/srv/media/project_12/scan_01.png".into(),
            output_dir: "/srv/media/outputs/project_12/scan_01".into(),
            output_prefix: "outputs/project_12/scan_01".to_string(),
        }
    }

    #[test]
    fn stage_paths_follow_fixed_layout() {
        let d = descriptor();
        assert_eq!(
            d.stage_results_path(Stage::Detection),
            PathBuf::from("/srv/media/outputs/project_12/scan_01/detection/final/results.json")
        );
        assert_eq!(
            d.stage_visual_path(Stage::Interpretation),
            PathBuf::from(
                "/srv/media/outputs/project_12/scan_01/interpretation/final/visual/scan_01.png"
            )
        );
        assert_eq!(
            d.stage_visual_rel(Stage::Recognition),
            "outputs/project_12/scan_01/recognition/final/visual/scan_01.png"
        );
        assert_eq!(
            d.artifact_path(),
            PathBuf::from("/srv/media/outputs/project_12/scan_01/job.json")
        );
    }

    #[test]
    fn rejects_invalid_image_names() {
        assert!(image_base_name("").is_err());
        assert!(image_base_name("no_extension").is_err());
        assert!(image_base_name(".png").is_err());
        assert!(image_base_name("..png").is_err());
        assert!(image_base_name("...png").is_err());
        assert!(image_base_name("doc.pdf").is_err());
        assert!(image_base_name("../escape.png").is_err());
    }

    #[test]
    fn accepts_allow_listed_extensions() {
        assert_eq!(image_base_name("scan.png").unwrap(), "scan");
        assert_eq!(image_base_name("scan.JPG").unwrap(), "scan");
        assert_eq!(image_base_name("archive.tar.jpeg").unwrap(), "archive.tar");
    }

    #[test]
    fn missing_model_falls_back_to_default() {
        assert_eq!(builder().resolve_model(None).unwrap(), 3);
        assert_eq!(builder().resolve_model(Some(7)).unwrap(), 7);
    }

    #[test]
    fn no_default_model_is_an_error() {
        let builder = ConfigBuilder::new("/srv/media", None);
        assert!(matches!(
            builder.resolve_model(None),
            Err(ConfigError::NoDefaultModel)
        ));
    }

    #[tokio::test]
    async fn discarding_outputs_removes_the_whole_tree() {
        let root = tempfile::tempdir().unwrap();
        let builder = ConfigBuilder::new(root.path(), None);
        builder.build(4, 9, "page.jpg", Some(7)).await.unwrap();
        let outputs = builder.project_output_dir(4);
        assert!(tokio::fs::try_exists(&outputs).await.unwrap());

        builder.discard_project_outputs(4).await.unwrap();
        assert!(!tokio::fs::try_exists(&outputs).await.unwrap());

        // Discarding a tree that is already gone still succeeds.
        builder.discard_project_outputs(4).await.unwrap();
    }

    #[tokio::test]
    async fn build_writes_descriptor_artifact() {
        let root = tempfile::tempdir().unwrap();
        let builder = ConfigBuilder::new(root.path(), None);

        let descriptor = builder.build(4, 9, "page.jpg", Some(7)).await.unwrap();

        assert_eq!(descriptor.model_id, 7);
        assert_eq!(descriptor.output_prefix, "outputs/project_4/page");
        let raw = tokio::fs::read(descriptor.artifact_path()).await.unwrap();
        let parsed: JobDescriptor = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed.image_id, 9);
        assert_eq!(parsed.input_path, root.path().join("project_4/page.jpg"));
    }
}
