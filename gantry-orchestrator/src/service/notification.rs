//! Notification Emitter
//!
//! Single source of truth for per-model outcomes. Every event is appended to
//! the notification log and projected onto the tracing output; there is no
//! other progress reporting path.

use gantry_core::domain::notification::{NotificationEvent, Severity};
use gantry_core::dto::notification::NotificationQuery;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::notification_repository;

#[derive(Clone)]
pub struct NotificationEmitter {
    pool: SqlitePool,
}

impl NotificationEmitter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one event and return it.
    ///
    /// A failed write is logged but never propagated: losing a log line must
    /// not turn a finished model into a failed one.
    pub async fn emit(
        &self,
        run_id: Option<Uuid>,
        model_name: &str,
        severity: Severity,
        message: impl Into<String>,
    ) -> NotificationEvent {
        let event = NotificationEvent {
            run_id,
            model_name: model_name.to_string(),
            severity,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        };

        project(&event);

        if let Err(e) = notification_repository::insert(&self.pool, &event).await {
            tracing::error!(
                "Failed to persist notification for {}: {}",
                event.model_name,
                e
            );
        }

        event
    }

    pub async fn query(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationEvent>, sqlx::Error> {
        notification_repository::find(&self.pool, query).await
    }
}

fn project(event: &NotificationEvent) {
    match event.severity {
        Severity::Success => tracing::info!("[{}] {}", event.model_name, event.message),
        Severity::Warning => tracing::warn!("[{}] {}", event.model_name, event.message),
        Severity::Error => tracing::error!("[{}] {}", event.model_name, event.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_emit_persists_and_returns_event() {
        let emitter = NotificationEmitter::new(test_pool().await);
        let run_id = Uuid::new_v4();

        let event = emitter
            .emit(Some(run_id), "m", Severity::Warning, "candidate rejected")
            .await;
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.message, "candidate rejected");

        let stored = emitter
            .query(&NotificationQuery {
                run_id: Some(run_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].model_name, "m");
        assert_eq!(stored[0].message, "candidate rejected");
    }
}
