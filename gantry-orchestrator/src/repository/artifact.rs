//! Artifact Repository
//!
//! Handles the version metadata table and the append-only status journal.
//! Nothing in here updates or deletes rows.

use gantry_core::domain::artifact::{ArtifactRecord, ArtifactStatus, StatusEvent};
use sqlx::SqliteExecutor;
use uuid::Uuid;

/// Insert the immutable metadata of a freshly staged version
pub async fn insert_version<'e, E: SqliteExecutor<'e>>(
    executor: E,
    record: &ArtifactRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO artifact_versions (id, model_name, created_at, score, blob_location, blob_sha256)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id)
    .bind(&record.model_name)
    .bind(record.created_at)
    .bind(record.score)
    .bind(&record.blob_location)
    .bind(&record.blob_sha256)
    .execute(executor)
    .await?;

    Ok(())
}

/// Append one status change to the journal
pub async fn append_event<'e, E: SqliteExecutor<'e>>(
    executor: E,
    version_id: Uuid,
    model_name: &str,
    status: ArtifactStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO artifact_events (version_id, model_name, status, recorded_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(version_id)
    .bind(model_name)
    .bind(status_to_string(status))
    .bind(chrono::Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

/// All version records of a model, in insertion order
pub async fn find_records<'e, E: SqliteExecutor<'e>>(
    executor: E,
    model_name: &str,
) -> Result<Vec<ArtifactRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VersionRow>(
        r#"
        SELECT id, model_name, created_at, score, blob_location, blob_sha256
        FROM artifact_versions
        WHERE model_name = ?
        ORDER BY seq ASC
        "#,
    )
    .bind(model_name)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// All status events of a model, in journal order
pub async fn find_events<'e, E: SqliteExecutor<'e>>(
    executor: E,
    model_name: &str,
) -> Result<Vec<StatusEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT seq, version_id, status, recorded_at
        FROM artifact_events
        WHERE model_name = ?
        ORDER BY seq ASC
        "#,
    )
    .bind(model_name)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(StatusEvent::try_from).collect()
}

/// Model a version belongs to
pub async fn find_model_name<'e, E: SqliteExecutor<'e>>(
    executor: E,
    version_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT model_name FROM artifact_versions WHERE id = ?")
            .bind(version_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.map(|(name,)| name))
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: ArtifactStatus) -> &'static str {
    match status {
        ArtifactStatus::Candidate => "Candidate",
        ArtifactStatus::Promoted => "Promoted",
        ArtifactStatus::Superseded => "Superseded",
        ArtifactStatus::RolledBack => "RolledBack",
    }
}

fn string_to_status(s: &str) -> Option<ArtifactStatus> {
    match s {
        "Candidate" => Some(ArtifactStatus::Candidate),
        "Promoted" => Some(ArtifactStatus::Promoted),
        "Superseded" => Some(ArtifactStatus::Superseded),
        "RolledBack" => Some(ArtifactStatus::RolledBack),
        _ => None,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    model_name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    score: f64,
    blob_location: String,
    blob_sha256: String,
}

impl From<VersionRow> for ArtifactRecord {
    fn from(row: VersionRow) -> Self {
        ArtifactRecord {
            id: row.id,
            model_name: row.model_name,
            created_at: row.created_at,
            score: row.score,
            blob_location: row.blob_location,
            blob_sha256: row.blob_sha256,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    seq: i64,
    version_id: Uuid,
    status: String,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<EventRow> for StatusEvent {
    type Error = sqlx::Error;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = string_to_status(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown artifact status '{}'", row.status).into())
        })?;

        Ok(StatusEvent {
            seq: row.seq,
            version_id: row.version_id,
            status,
            recorded_at: row.recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn record(model: &str) -> ArtifactRecord {
        ArtifactRecord {
            id: Uuid::new_v4(),
            model_name: model.to_string(),
            created_at: chrono::Utc::now(),
            score: 0.5,
            blob_location: format!("{}/x.bin", model),
            blob_sha256: "ff".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_and_events_round_trip_in_order() {
        let pool = test_pool().await;
        let a = record("m");
        let b = record("m");
        let other = record("other");

        insert_version(&pool, &a).await.unwrap();
        insert_version(&pool, &b).await.unwrap();
        insert_version(&pool, &other).await.unwrap();
        append_event(&pool, a.id, "m", ArtifactStatus::Promoted)
            .await
            .unwrap();
        append_event(&pool, b.id, "m", ArtifactStatus::RolledBack)
            .await
            .unwrap();

        let records = find_records(&pool, "m").await.unwrap();
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(records[0].blob_location, "m/x.bin");
        assert_eq!(records[0].score, 0.5);

        let events = find_events(&pool, "m").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version_id, a.id);
        assert_eq!(events[0].status, ArtifactStatus::Promoted);
        assert_eq!(events[1].status, ArtifactStatus::RolledBack);
        assert!(events[0].seq < events[1].seq);

        assert_eq!(
            find_model_name(&pool, other.id).await.unwrap(),
            Some("other".to_string())
        );
        assert_eq!(find_model_name(&pool, Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_status_is_a_decode_error() {
        let pool = test_pool().await;
        let a = record("m");
        insert_version(&pool, &a).await.unwrap();
        sqlx::query(
            "INSERT INTO artifact_events (version_id, model_name, status, recorded_at) \
             VALUES (?, 'm', 'Bogus', ?)",
        )
        .bind(a.id)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        assert!(matches!(
            find_events(&pool, "m").await,
            Err(sqlx::Error::Decode(_))
        ));
    }
}
