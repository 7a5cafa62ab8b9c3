pub mod ai_model;
pub mod image;
pub mod project;
pub mod result_set;
