//! Notification Repository
//!
//! Append-only storage for the notification log.

use gantry_core::domain::notification::{NotificationEvent, Severity};
use gantry_core::dto::notification::NotificationQuery;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 1000;

/// Append one notification
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    event: &NotificationEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (run_id, model_name, severity, message, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.run_id)
    .bind(&event.model_name)
    .bind(severity_to_string(event.severity))
    .bind(&event.message)
    .bind(event.timestamp)
    .execute(executor)
    .await?;

    Ok(())
}

/// Notifications matching the optional filters, oldest first
pub async fn find<'e, E: SqliteExecutor<'e>>(
    executor: E,
    query: &NotificationQuery,
) -> Result<Vec<NotificationEvent>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT run_id, model_name, severity, message, timestamp FROM notifications WHERE 1 = 1",
    );

    if let Some(severity) = query.severity {
        builder
            .push(" AND severity = ")
            .push_bind(severity_to_string(severity));
    }
    if let Some(model) = &query.model {
        builder.push(" AND model_name = ").push_bind(model.clone());
    }
    if let Some(run_id) = query.run_id {
        builder.push(" AND run_id = ").push_bind(run_id);
    }

    builder
        .push(" ORDER BY id ASC LIMIT ")
        .push_bind(query.limit.unwrap_or(DEFAULT_LIMIT));

    let rows = builder
        .build_query_as::<NotificationRow>()
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn severity_to_string(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "Success",
        Severity::Warning => "Warning",
        Severity::Error => "Error",
    }
}

fn string_to_severity(s: &str) -> Severity {
    match s {
        "Success" => Severity::Success,
        "Warning" => Severity::Warning,
        _ => Severity::Error,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct NotificationRow {
    run_id: Option<Uuid>,
    model_name: String,
    severity: String,
    message: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<NotificationRow> for NotificationEvent {
    fn from(row: NotificationRow) -> Self {
        NotificationEvent {
            run_id: row.run_id,
            model_name: row.model_name,
            severity: string_to_severity(&row.severity),
            message: row.message,
            timestamp: row.timestamp,
        }
    }
}
