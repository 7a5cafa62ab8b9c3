pub mod health;
pub mod images;
pub mod metrics;
pub mod models;
pub mod process;
pub mod projects;
