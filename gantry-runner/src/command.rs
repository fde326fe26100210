//! Command-backed training jobs
//!
//! Runs an external training program. The program receives:
//! - `GANTRY_DATASET`: location of the ingested dataset
//! - `GANTRY_HYPERPARAMS`: hyperparameters as a JSON object
//! - `GANTRY_OUTPUT_DIR`: scratch directory it must write `artifact.bin` into
//!
//! and reports its evaluation score as the last line of stdout, e.g.
//! `{"score": 0.93}`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use gantry_core::domain::dataset::DatasetHandle;
use gantry_core::domain::model::{EntryPoint, Hyperparams, ModelDefinition};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::job::{TrainingJob, TrainingOutput};

/// File name the training program must write its artifact to
pub const ARTIFACT_FILE: &str = "artifact.bin";

const STDERR_TAIL_CHARS: usize = 2000;

/// Training job that shells out to an external program
#[derive(Debug, Clone)]
pub struct CommandJob {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    /// Parent directory for per-invocation scratch dirs
    work_dir: PathBuf,
}

impl CommandJob {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            env,
            work_dir: work_dir.into(),
        }
    }

    /// Resolves a model's entry point into a runnable job
    pub fn from_definition(definition: &ModelDefinition, work_dir: &Path) -> Self {
        match &definition.entry_point {
            EntryPoint::Command { program, args, env } => Self::new(
                program.clone(),
                args.clone(),
                env.clone(),
                work_dir.join(&definition.name),
            ),
        }
    }

    async fn execute(
        &self,
        dataset: &DatasetHandle,
        hyperparams: &Hyperparams,
        output_dir: &Path,
    ) -> Result<TrainingOutput> {
        let hyperparams_json =
            serde_json::to_string(hyperparams).context("Failed to encode hyperparameters")?;

        debug!("Executing training command: {} {:?}", self.program, self.args);

        // kill_on_drop: aborting the runner task must also stop the process
        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .env("GANTRY_DATASET", &dataset.location)
            .env("GANTRY_HYPERPARAMS", hyperparams_json)
            .env("GANTRY_OUTPUT_DIR", output_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute training command '{}'", self.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stderr.trim().is_empty() {
            debug!("training command stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "training command '{}' exited with code {}: {}",
                self.program,
                exit_code,
                tail(stderr.trim(), STDERR_TAIL_CHARS)
            );
        }

        let score = parse_score(&stdout)?;

        let artifact_path = output_dir.join(ARTIFACT_FILE);
        let blob = tokio::fs::read(&artifact_path).await.with_context(|| {
            format!(
                "training command did not produce {}",
                artifact_path.display()
            )
        })?;

        Ok(TrainingOutput { blob, score })
    }
}

#[async_trait]
impl TrainingJob for CommandJob {
    async fn train(
        &self,
        dataset: &DatasetHandle,
        hyperparams: &Hyperparams,
    ) -> Result<TrainingOutput> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.work_dir.display()))?;

        // Removed on drop, also when the runner aborts this job mid-training
        let scratch = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.work_dir)
            .with_context(|| {
                format!("Failed to create scratch dir in {}", self.work_dir.display())
            })?;

        let result = self.execute(dataset, hyperparams, scratch.path()).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to clean up {}: {}", scratch_path.display(), e);
        }

        result
    }
}

#[derive(Deserialize)]
struct ScoreLine {
    score: f64,
}

/// Extracts the score from the last non-empty stdout line
pub fn parse_score(stdout: &str) -> Result<f64> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| anyhow!("training command printed no score line"))?;

    let parsed: ScoreLine = serde_json::from_str(line)
        .with_context(|| format!("last stdout line is not a score report: {}", line))?;

    Ok(parsed.score)
}

fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let skip = count - max_chars;
    let start = s.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &s[start..]
}
