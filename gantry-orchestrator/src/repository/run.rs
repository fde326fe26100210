//! Training Run Repository

use gantry_core::domain::run::{RunOutcome, TrainingRun};
use sqlx::SqliteExecutor;
use uuid::Uuid;

/// Persist a terminal training run
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    run: &TrainingRun,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO training_runs
            (id, pipeline_run_id, model_name, started_at, finished_at, outcome, error_detail)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run.id)
    .bind(run.pipeline_run_id)
    .bind(&run.model_name)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(outcome_to_string(run.outcome))
    .bind(&run.error_detail)
    .execute(executor)
    .await?;

    Ok(())
}

/// Training runs of a model, oldest first
pub async fn find_by_model<'e, E: SqliteExecutor<'e>>(
    executor: E,
    model_name: &str,
) -> Result<Vec<TrainingRun>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, pipeline_run_id, model_name, started_at, finished_at, outcome, error_detail
        FROM training_runs
        WHERE model_name = ?
        ORDER BY seq ASC
        "#,
    )
    .bind(model_name)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn outcome_to_string(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Succeeded => "Succeeded",
        RunOutcome::Failed => "Failed",
        RunOutcome::TimedOut => "TimedOut",
    }
}

fn string_to_outcome(s: &str) -> RunOutcome {
    match s {
        "Succeeded" => RunOutcome::Succeeded,
        "TimedOut" => RunOutcome::TimedOut,
        _ => RunOutcome::Failed,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    pipeline_run_id: Uuid,
    model_name: String,
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
    outcome: String,
    error_detail: Option<String>,
}

impl From<RunRow> for TrainingRun {
    fn from(row: RunRow) -> Self {
        TrainingRun {
            id: row.id,
            pipeline_run_id: row.pipeline_run_id,
            model_name: row.model_name,
            started_at: row.started_at,
            finished_at: row.finished_at,
            outcome: string_to_outcome(&row.outcome),
            error_detail: row.error_detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = test_pool().await;
        let pipeline_run_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        for (outcome, detail) in [
            (RunOutcome::Succeeded, None),
            (RunOutcome::TimedOut, Some("timed out".to_string())),
        ] {
            insert(
                &pool,
                &TrainingRun {
                    id: Uuid::new_v4(),
                    pipeline_run_id,
                    model_name: "m".to_string(),
                    started_at: now,
                    finished_at: now,
                    outcome,
                    error_detail: detail,
                },
            )
            .await
            .unwrap();
        }

        let runs = find_by_model(&pool, "m").await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].outcome, RunOutcome::Succeeded);
        assert_eq!(runs[1].outcome, RunOutcome::TimedOut);
        assert_eq!(runs[1].error_detail.as_deref(), Some("timed out"));
        assert!(find_by_model(&pool, "other").await.unwrap().is_empty());
    }
}
