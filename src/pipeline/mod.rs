//! Batch processing over an external AI pipeline.
//!
//! One run fans out over a project's images: the descriptor module builds a
//! per-image job artifact, the runner invokes the pipeline process on it,
//! the collector gathers the artifacts it wrote, and the orchestrator
//! bounds the concurrency and aggregates everything into a [`report::BatchReport`].
//! The filesystem layout shared with the pipeline lives entirely in
//! `descriptor` and `collector`.

pub mod collector;
pub mod descriptor;
pub mod orchestrator;
pub mod report;
pub mod runner;
