use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AlertStore, Result, StoreError, MAX_ALERTS};
use crate::db::{queries, DbPool};
use crate::models::{AlertDefinition, AlertStatus, AlertView, NewAlert};

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgAlertStore {
    pool: DbPool,
}

impl PgAlertStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn list_all(&self) -> Result<Vec<AlertDefinition>> {
        let alerts = sqlx::query_as::<_, AlertDefinition>(queries::SELECT_ALERTS)
            .fetch_all(&self.pool)
            .await?;
        Ok(alerts)
    }

    async fn list_with_status(&self) -> Result<Vec<AlertView>> {
        let alerts = sqlx::query_as::<_, AlertView>(queries::SELECT_ALERTS_WITH_LATEST_STATUS)
            .fetch_all(&self.pool)
            .await?;
        Ok(alerts)
    }

    async fn list_triggered(&self) -> Result<Vec<AlertView>> {
        let alerts = sqlx::query_as::<_, AlertView>(queries::SELECT_TRIGGERED_ALERTS)
            .fetch_all(&self.pool)
            .await?;
        Ok(alerts)
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<AlertDefinition> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(queries::LOCK_ALERTS_FOR_CREATE)
            .execute(&mut *tx)
            .await?;

        let current: i64 = sqlx::query_scalar(queries::COUNT_ALERTS)
            .fetch_one(&mut *tx)
            .await?;
        if current >= MAX_ALERTS {
            tx.rollback().await?;
            return Err(StoreError::CapacityExceeded {
                current,
                max: MAX_ALERTS,
            });
        }

        let created = sqlx::query_as::<_, AlertDefinition>(queries::INSERT_ALERT)
            .bind(alert.lat)
            .bind(alert.lon)
            .bind(alert.parameter.as_str())
            .bind(alert.operator.as_str())
            .bind(alert.threshold)
            .bind(&alert.description)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(alert_id = created.id, "Alert created");
        Ok(created)
    }

    async fn delete_alert(&self, id: i32) -> Result<AlertDefinition> {
        let deleted = sqlx::query_as::<_, AlertDefinition>(queries::DELETE_ALERT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        tracing::info!(alert_id = id, "Alert deleted");
        Ok(deleted)
    }

    async fn upsert_status(
        &self,
        alert_id: i32,
        is_triggered: bool,
        checked_at: DateTime<Utc>,
        current_value: Option<f64>,
    ) -> Result<AlertStatus> {
        let inserted = sqlx::query_as::<_, AlertStatus>(queries::INSERT_ALERT_STATUS)
            .bind(alert_id)
            .bind(is_triggered)
            .bind(checked_at)
            .bind(current_value)
            .fetch_optional(&self.pool)
            .await;

        match inserted {
            Ok(Some(status)) => Ok(status),
            Ok(None) => Err(StoreError::NotFound(alert_id)),
            // The alert was deleted between the existence check and the insert.
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                Err(StoreError::NotFound(alert_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query(queries::PING).execute(&self.pool).await?;
        Ok(())
    }
}
