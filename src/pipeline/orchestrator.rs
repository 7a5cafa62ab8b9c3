use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::result_store::ResultStore;
use crate::models::image::Image;
use crate::models::project::Project;
use crate::models::result_set::NewResultSet;

use super::collector;
use super::descriptor::ConfigBuilder;
use super::report::{BatchReport, FailureReason, PerImageResult};
use super::runner::{PipelineRunner, RunStatus};

/// Failures that abort a whole run, as opposed to one image.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("project {0} has no model configured")]
    NoModelConfigured(i64),

    #[error("could not purge stale output dir {dir}: {source}")]
    Purge {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fans pipeline work out over a project's images and aggregates the
/// outcome into one report.
///
/// Per-image failures are captured into the report, never propagated; the
/// only fatal conditions are a missing model (checked before any image is
/// touched) and an un-purgeable stale output tree. Units run inside this
/// future, so dropping it cancels in-flight work and kills child processes.
pub struct BatchOrchestrator {
    builder: ConfigBuilder,
    runner: PipelineRunner,
    store: Arc<dyn ResultStore>,
    max_concurrent: usize,
}

impl BatchOrchestrator {
    pub fn new(
        builder: ConfigBuilder,
        runner: PipelineRunner,
        store: Arc<dyn ResultStore>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            builder,
            runner,
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run the pipeline over every image of one project.
    ///
    /// Synchronous from the caller's point of view: returns only once every
    /// image has either succeeded or failed. Safe to re-invoke on the same
    /// project; the purge step removes the previous run's tree. Two
    /// simultaneous runs on one project are not supported and must be
    /// rejected or serialized by the caller.
    pub async fn run(&self, project: &Project, images: &[Image]) -> Result<BatchReport, BatchError> {
        let model_id = project
            .model_id
            .ok_or(BatchError::NoModelConfigured(project.id))?;

        let start = Instant::now();
        self.purge_output_dir(project.id).await?;

        info!(
            project_id = %project.id,
            model_id = %model_id,
            images = images.len(),
            "starting batch run"
        );

        // Each unit owns its image; borrowing the slice item here trips the
        // compiler's Send check once the future crosses a task boundary.
        let mut results: Vec<(usize, PerImageResult)> =
            stream::iter(images.to_vec().into_iter().enumerate())
                .map(|(index, image)| async move {
                    (index, self.process_image(project.id, model_id, &image).await)
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;
        // Completion order is arbitrary; report in upload order.
        results.sort_by_key(|(index, _)| *index);

        let (successful, failed): (Vec<_>, Vec<_>) = results
            .into_iter()
            .map(|(_, result)| result)
            .partition(|r| r.success);

        let total_duration = start.elapsed();
        metrics::counter!("docsight_images_processed_total").increment(successful.len() as u64);
        metrics::counter!("docsight_images_failed_total").increment(failed.len() as u64);
        metrics::histogram!("docsight_batch_duration_seconds").record(total_duration.as_secs_f64());

        info!(
            project_id = %project.id,
            successful = successful.len(),
            failed = failed.len(),
            duration_secs = total_duration.as_secs_f64(),
            "batch run finished"
        );

        Ok(BatchReport {
            project_id: project.id,
            model_id,
            error: !failed.is_empty(),
            successful,
            failed,
            total_processing_time: total_duration.as_secs_f64(),
        })
    }

    /// One unit of work: build the descriptor, run the pipeline, collect
    /// artifacts, persist. Every failure mode ends up as report data.
    async fn process_image(&self, project_id: i64, model_id: i64, image: &Image) -> PerImageResult {
        let descriptor = match self
            .builder
            .build(project_id, image.id, &image.file_name, Some(model_id))
            .await
        {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(
                    project_id = %project_id,
                    image = %image.file_name,
                    error = %e,
                    "job descriptor build failed"
                );
                return PerImageResult::failed(
                    image.id,
                    image.file_name.clone(),
                    FailureReason::PipelineFailure,
                    format!("job descriptor build failed: {e}"),
                );
            }
        };

        let outcome = self.runner.run(&descriptor).await;
        match outcome.status {
            RunStatus::Completed => {}
            RunStatus::TimedOut => {
                warn!(
                    project_id = %project_id,
                    image = %image.file_name,
                    duration_secs = outcome.duration.as_secs_f64(),
                    "pipeline run timed out"
                );
                return PerImageResult::failed(
                    image.id,
                    image.file_name.clone(),
                    FailureReason::Timeout,
                    format!(
                        "pipeline killed after {:.1}s",
                        outcome.duration.as_secs_f64()
                    ),
                );
            }
            RunStatus::Failed { detail } => {
                warn!(
                    project_id = %project_id,
                    image = %image.file_name,
                    detail = %detail,
                    "pipeline run failed"
                );
                return PerImageResult::failed(
                    image.id,
                    image.file_name.clone(),
                    FailureReason::PipelineFailure,
                    detail,
                );
            }
        }

        let result = collector::collect(&descriptor).await;
        if !result.success {
            return result;
        }

        self.persist(project_id, image, result).await
    }

    /// Persist a successful result, demoting it to a per-image failure when
    /// the store refuses it.
    async fn persist(
        &self,
        project_id: i64,
        image: &Image,
        result: PerImageResult,
    ) -> PerImageResult {
        let Some(artifacts) = &result.artifacts else {
            return result;
        };

        let new = NewResultSet {
            image_id: image.id,
            project_id,
            detection: artifacts.detection.clone(),
            recognition: artifacts.recognition.clone(),
            interpretation: artifacts.interpretation.clone(),
            detection_image_path: artifacts.detection_image_path.clone(),
            recognition_image_path: artifacts.recognition_image_path.clone(),
            interpretation_image_path: artifacts.interpretation_image_path.clone(),
        };

        match self.store.create_result_set(new).await {
            Ok(()) => result,
            Err(e) => {
                error!(
                    project_id = %project_id,
                    image = %image.file_name,
                    error = %e,
                    "result set persistence failed"
                );
                PerImageResult::failed(
                    image.id,
                    image.file_name.clone(),
                    FailureReason::PersistenceFailure,
                    e.to_string(),
                )
            }
        }
    }

    /// Remove a project's output tree, for re-runs and project deletion.
    /// Absence is not an error.
    pub async fn discard_project_outputs(&self, project_id: i64) -> std::io::Result<()> {
        self.builder.discard_project_outputs(project_id).await
    }

    /// Remove the previous run's output tree. Absence is not an error.
    async fn purge_output_dir(&self, project_id: i64) -> Result<(), BatchError> {
        self.discard_project_outputs(project_id)
            .await
            .map_err(|source| BatchError::Purge {
                dir: self.builder.project_output_dir(project_id),
                source,
            })
    }
}
