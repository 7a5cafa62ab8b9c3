//! Docsight Batch Processing System
//!
//! This library provides the core functionality for the docsight system,
//! which runs an external AI document-analysis pipeline over projects of
//! uploaded images and aggregates the results.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
