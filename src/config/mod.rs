use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the batch CLI.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Root directory for uploaded images and pipeline output trees
    #[serde(default = "default_media_root")]
    pub media_root: String,

    /// Command line of the external AI pipeline; the job descriptor path is
    /// appended as the final argument (e.g., "python3 -m pipeline")
    pub pipeline_program: String,

    /// Model substituted when a project is created without one
    #[serde(default)]
    pub default_model_id: Option<i64>,

    /// Upper bound on per-image pipeline processes in flight
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Per-image pipeline timeout in seconds; overruns are killed
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_media_root() -> String {
    "./media".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_job_timeout_secs() -> u64 {
    600
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn job_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_timeout_secs)
    }
}
