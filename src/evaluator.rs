use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{AlertDefinition, Operator, Parameter, WeatherSample};
use crate::store::{AlertStore, StoreError};
use crate::weather::{WeatherError, WeatherProvider};

/// Why a single alert could not be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("weather parameter '{0}' not available")]
    ParameterNotAvailable(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("failed to record status: {0}")]
    Persist(#[from] StoreError),
}

/// Result of evaluating one alert within a pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub alert_id: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_triggered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherSample>,
    pub evaluated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationOutcome {
    fn failed(alert_id: i32, error: &EvaluationError) -> Self {
        Self {
            alert_id,
            success: false,
            is_triggered: None,
            current_value: None,
            weather_data: None,
            evaluated_at: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// Applies `operator` to `value` and `threshold`. `=` is exact equality.
pub fn evaluate_condition(
    value: f64,
    operator: &str,
    threshold: f64,
) -> Result<bool, EvaluationError> {
    let op: Operator = operator
        .parse()
        .map_err(|_| EvaluationError::UnknownOperator(operator.to_string()))?;
    Ok(op.check(value, threshold))
}

struct Reading {
    value: f64,
    is_triggered: bool,
    sample: WeatherSample,
}

#[derive(Clone)]
pub struct AlertEvaluator {
    store: Arc<dyn AlertStore>,
    weather: Arc<dyn WeatherProvider>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn AlertStore>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { store, weather }
    }

    /// Evaluates every stored alert against fresh weather and records the
    /// successful results. Alerts are processed concurrently and independently:
    /// a failure is reported in that alert's outcome and never aborts the pass.
    /// Fails only when the alert list itself cannot be loaded.
    pub async fn evaluate_all(&self) -> Result<Vec<EvaluationOutcome>, StoreError> {
        let alerts = self.store.list_all().await?;

        if alerts.is_empty() {
            info!("No alerts found to evaluate");
            return Ok(Vec::new());
        }

        info!(count = alerts.len(), "Evaluating alerts");

        let outcomes = join_all(alerts.iter().map(|alert| self.process(alert))).await;

        let recorded = outcomes.iter().filter(|o| o.success).count();
        info!(
            evaluated = outcomes.len(),
            recorded = recorded,
            "Alert statuses updated"
        );

        Ok(outcomes)
    }

    async fn process(&self, alert: &AlertDefinition) -> EvaluationOutcome {
        let evaluated_at = Utc::now();

        let reading = match self.read(alert).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(alert_id = alert.id, error = %e, "Error evaluating alert");
                return EvaluationOutcome::failed(alert.id, &e);
            }
        };

        info!(
            alert_id = alert.id,
            parameter = %alert.parameter,
            value = reading.value,
            operator = %alert.operator,
            threshold = alert.threshold,
            triggered = reading.is_triggered,
            "Alert evaluated"
        );

        if let Err(e) = self
            .store
            .upsert_status(
                alert.id,
                reading.is_triggered,
                evaluated_at,
                Some(reading.value),
            )
            .await
        {
            let e = EvaluationError::from(e);
            warn!(alert_id = alert.id, error = %e, "Error updating alert status");
            return EvaluationOutcome::failed(alert.id, &e);
        }

        EvaluationOutcome {
            alert_id: alert.id,
            success: true,
            is_triggered: Some(reading.is_triggered),
            current_value: Some(reading.value),
            weather_data: Some(reading.sample),
            evaluated_at,
            error: None,
        }
    }

    async fn read(&self, alert: &AlertDefinition) -> Result<Reading, EvaluationError> {
        let sample = self.weather.fetch(alert.lat, alert.lon).await?;

        let value = alert
            .parameter
            .parse::<Parameter>()
            .ok()
            .and_then(|p| sample.value(p))
            .ok_or_else(|| EvaluationError::ParameterNotAvailable(alert.parameter.clone()))?;

        let is_triggered = evaluate_condition(value, &alert.operator, alert.threshold)?;

        Ok(Reading {
            value,
            is_triggered,
            sample,
        })
    }
}
