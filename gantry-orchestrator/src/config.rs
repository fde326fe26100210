//! Orchestrator configuration
//!
//! Defines all configurable parameters for the server: storage locations,
//! the model catalogue, and job execution limits.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite URL of the metadata journal and notification log
    pub database_url: String,

    /// HTTP listen address
    pub bind_addr: String,

    /// Root directory of artifact blobs
    pub blob_dir: PathBuf,

    /// Parent directory of per-job scratch directories
    pub work_dir: PathBuf,

    /// Model catalogue file
    pub catalogue_path: PathBuf,

    /// Dataset source used by `POST /pipeline/run`
    pub dataset_source: String,

    /// Default per-job timeout, overridable per model
    pub job_timeout: Duration,

    /// Max training jobs running at once within a category
    pub max_parallel_jobs: usize,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Every variable is optional:
    /// - DATABASE_URL (default: sqlite://gantry.db)
    /// - GANTRY_BIND_ADDR (default: 0.0.0.0:8080)
    /// - GANTRY_BLOB_DIR (default: ./blobs)
    /// - GANTRY_WORK_DIR (default: ./work)
    /// - GANTRY_CATALOGUE (default: ./catalogue.json)
    /// - GANTRY_DATASET (default: ./data/dataset.csv)
    /// - JOB_TIMEOUT (seconds, default: 1800)
    /// - MAX_PARALLEL_JOBS (default: 4)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let job_timeout = match std::env::var("JOB_TIMEOUT") {
            Ok(s) => Duration::from_secs(
                s.parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("JOB_TIMEOUT must be a number of seconds"))?,
            ),
            Err(_) => defaults.job_timeout,
        };

        let max_parallel_jobs = match std::env::var("MAX_PARALLEL_JOBS") {
            Ok(s) => s
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("MAX_PARALLEL_JOBS must be a positive integer"))?,
            Err(_) => defaults.max_parallel_jobs,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: std::env::var("GANTRY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            blob_dir: std::env::var("GANTRY_BLOB_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_dir),
            work_dir: std::env::var("GANTRY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            catalogue_path: std::env::var("GANTRY_CATALOGUE")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalogue_path),
            dataset_source: std::env::var("GANTRY_DATASET").unwrap_or(defaults.dataset_source),
            job_timeout,
            max_parallel_jobs,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!("database_url must be a sqlite: URL");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.dataset_source.is_empty() {
            anyhow::bail!("dataset_source cannot be empty");
        }

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://gantry.db".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            blob_dir: PathBuf::from("./blobs"),
            work_dir: PathBuf::from("./work"),
            catalogue_path: PathBuf::from("./catalogue.json"),
            dataset_source: "./data/dataset.csv".to_string(),
            job_timeout: Duration::from_secs(1800),
            max_parallel_jobs: 4,
        }
    }
}
