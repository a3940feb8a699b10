use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One evaluation checkpoint. Rows are append-only; the latest `checked_at`
/// per alert is the alert's current status.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AlertStatus {
    pub id: i64,
    pub alert_id: i32,
    pub is_triggered: bool,
    pub current_value: Option<f64>,
    pub checked_at: DateTime<Utc>,
}
