//! Notification DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::notification::Severity;

/// Query parameters of `GET /pipeline/notifications`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub severity: Option<Severity>,
    pub model: Option<String>,
    pub run_id: Option<Uuid>,
    pub limit: Option<i64>,
}
