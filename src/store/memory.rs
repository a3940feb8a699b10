use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{AlertStore, Result, StoreError, MAX_ALERTS};
use crate::models::{AlertDefinition, AlertStatus, AlertView, NewAlert};

#[derive(Default)]
struct State {
    alerts: Vec<AlertDefinition>,
    statuses: Vec<AlertStatus>,
    next_alert_id: i32,
    next_status_id: i64,
}

impl State {
    fn latest_status(&self, alert_id: i32) -> Option<&AlertStatus> {
        self.statuses
            .iter()
            .filter(|s| s.alert_id == alert_id)
            .max_by_key(|s| (s.checked_at, s.id))
    }

    fn view(&self, alert: &AlertDefinition) -> AlertView {
        let latest = self.latest_status(alert.id);
        AlertView {
            alert: alert.clone(),
            is_triggered: latest.map(|s| s.is_triggered),
            current_value: latest.and_then(|s| s.current_value),
            checked_at: latest.map(|s| s.checked_at),
        }
    }

    fn newest_first(&self) -> Vec<&AlertDefinition> {
        let mut alerts: Vec<_> = self.alerts.iter().collect();
        alerts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        alerts
    }
}

/// Process-local store backing the evaluator, scheduler and API tests.
#[derive(Default)]
pub struct MemoryAlertStore {
    state: Mutex<State>,
    fail_listing: AtomicBool,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, bypassing validation and the alert cap.
    pub async fn insert_raw(&self, alert: AlertDefinition) {
        let mut state = self.state.lock().await;
        state.next_alert_id = state.next_alert_id.max(alert.id);
        state.alerts.push(alert);
    }

    pub async fn statuses(&self) -> Vec<AlertStatus> {
        self.state.lock().await.statuses.clone()
    }

    /// Makes `list_all` fail, as an unreachable database would.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_all(&self) -> Result<Vec<AlertDefinition>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let state = self.state.lock().await;
        Ok(state.newest_first().into_iter().cloned().collect())
    }

    async fn list_with_status(&self) -> Result<Vec<AlertView>> {
        let state = self.state.lock().await;
        Ok(state
            .newest_first()
            .into_iter()
            .map(|alert| state.view(alert))
            .collect())
    }

    async fn list_triggered(&self) -> Result<Vec<AlertView>> {
        let state = self.state.lock().await;
        let mut views: Vec<AlertView> = state
            .alerts
            .iter()
            .map(|alert| state.view(alert))
            .filter(|view| view.is_triggered == Some(true))
            .collect();
        views.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        Ok(views)
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<AlertDefinition> {
        let mut state = self.state.lock().await;
        let current = state.alerts.len() as i64;
        if current >= MAX_ALERTS {
            return Err(StoreError::CapacityExceeded {
                current,
                max: MAX_ALERTS,
            });
        }
        state.next_alert_id += 1;
        let created = AlertDefinition {
            id: state.next_alert_id,
            lat: alert.lat,
            lon: alert.lon,
            parameter: alert.parameter.as_str().to_string(),
            operator: alert.operator.as_str().to_string(),
            threshold: alert.threshold,
            description: alert.description,
            created_at: Utc::now(),
        };
        state.alerts.push(created.clone());
        Ok(created)
    }

    async fn delete_alert(&self, id: i32) -> Result<AlertDefinition> {
        let mut state = self.state.lock().await;
        let index = state
            .alerts
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = state.alerts.remove(index);
        state.statuses.retain(|s| s.alert_id != id);
        Ok(removed)
    }

    async fn upsert_status(
        &self,
        alert_id: i32,
        is_triggered: bool,
        checked_at: DateTime<Utc>,
        current_value: Option<f64>,
    ) -> Result<AlertStatus> {
        let mut state = self.state.lock().await;
        if !state.alerts.iter().any(|a| a.id == alert_id) {
            return Err(StoreError::NotFound(alert_id));
        }
        state.next_status_id += 1;
        let status = AlertStatus {
            id: state.next_status_id,
            alert_id,
            is_triggered,
            current_value,
            checked_at,
        };
        state.statuses.push(status.clone());
        Ok(status)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operator, Parameter};
    use chrono::Duration;
    use std::sync::Arc;

    fn new_alert(threshold: f64) -> NewAlert {
        NewAlert {
            lat: 40.71,
            lon: -74.0,
            parameter: Parameter::Temperature,
            operator: Operator::GreaterThan,
            threshold,
            description: None,
        }
    }

    #[tokio::test]
    async fn fourth_alert_is_rejected() {
        let store = MemoryAlertStore::new();
        for t in [1.0, 2.0, 3.0] {
            store.create_alert(new_alert(t)).await.unwrap();
        }

        let err = store.create_alert(new_alert(4.0)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::CapacityExceeded { current: 3, max: 3 }
        ));
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_creates_respect_cap() {
        let store = Arc::new(MemoryAlertStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create_alert(new_alert(i as f64)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, MAX_ALERTS);
        assert_eq!(store.list_all().await.unwrap().len() as i64, MAX_ALERTS);
    }

    #[tokio::test]
    async fn triggered_uses_latest_checkpoint() {
        let store = MemoryAlertStore::new();
        let a = store.create_alert(new_alert(1.0)).await.unwrap();
        let b = store.create_alert(new_alert(2.0)).await.unwrap();
        let c = store.create_alert(new_alert(3.0)).await.unwrap();

        let t1 = Utc::now() - Duration::minutes(30);
        let t2 = t1 + Duration::minutes(10);
        let t3 = t1 + Duration::minutes(20);

        store.upsert_status(c.id, true, t1, Some(5.0)).await.unwrap();
        store.upsert_status(a.id, true, t2, Some(4.0)).await.unwrap();
        store.upsert_status(b.id, false, t2, Some(0.0)).await.unwrap();
        store.upsert_status(c.id, false, t3, Some(2.0)).await.unwrap();

        let triggered = store.list_triggered().await.unwrap();
        let ids: Vec<i32> = triggered.iter().map(|v| v.alert.id).collect();
        assert_eq!(ids, vec![a.id]);
        assert_eq!(triggered[0].current_value, Some(4.0));
    }

    #[tokio::test]
    async fn delete_cascades_status_history() {
        let store = MemoryAlertStore::new();
        let a = store.create_alert(new_alert(1.0)).await.unwrap();
        let b = store.create_alert(new_alert(2.0)).await.unwrap();
        store.upsert_status(a.id, true, Utc::now(), Some(1.5)).await.unwrap();
        store.upsert_status(a.id, false, Utc::now(), Some(0.5)).await.unwrap();
        store.upsert_status(b.id, true, Utc::now(), Some(9.0)).await.unwrap();

        store.delete_alert(a.id).await.unwrap();

        let remaining: Vec<i32> = store.list_all().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(remaining, vec![b.id]);
        assert!(store.statuses().await.iter().all(|s| s.alert_id == b.id));
        assert!(matches!(
            store.delete_alert(a.id).await,
            Err(StoreError::NotFound(id)) if id == a.id
        ));
    }

    #[tokio::test]
    async fn status_for_unknown_alert_is_not_found() {
        let store = MemoryAlertStore::new();
        let err = store
            .upsert_status(42, true, Utc::now(), Some(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
        assert!(store.statuses().await.is_empty());
    }
}
