use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
pub mod memory;
pub mod postgres;

use crate::models::{AlertDefinition, AlertStatus, AlertView, NewAlert};

pub use postgres::PgAlertStore;

/// Upper bound on alerts that may exist at the same time.
pub const MAX_ALERTS: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("alert {0} not found")]
    NotFound(i32),

    #[error("maximum alert limit reached ({current}/{max})")]
    CapacityExceeded { current: i64, max: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for alert definitions and their status history.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<AlertDefinition>>;

    /// Every alert with its latest status, newest alert first.
    async fn list_with_status(&self) -> Result<Vec<AlertView>>;

    /// Alerts whose latest status is triggered, most recently checked first.
    async fn list_triggered(&self) -> Result<Vec<AlertView>>;

    /// Inserts the alert unless [`MAX_ALERTS`] already exist. The count and the
    /// insert happen atomically with respect to other creates.
    async fn create_alert(&self, alert: NewAlert) -> Result<AlertDefinition>;

    /// Removes the alert together with its status history.
    async fn delete_alert(&self, id: i32) -> Result<AlertDefinition>;

    /// Appends a status checkpoint for an existing alert.
    async fn upsert_status(
        &self,
        alert_id: i32,
        is_triggered: bool,
        checked_at: DateTime<Utc>,
        current_value: Option<f64>,
    ) -> Result<AlertStatus>;

    async fn ping(&self) -> Result<()>;
}
