use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};

use super::error::ApiError;
use super::AppState;
use crate::models::{NewAlert, Operator, Parameter};

type JsonBody = Result<Json<Map<String, Value>>, JsonRejection>;

const REQUIRED_FIELDS: [&str; 5] = ["lat", "lon", "parameter", "operator", "threshold"];

/// GET /api/alerts
pub async fn list_alerts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let alerts = state.store.list_with_status().await?;
    Ok(Json(json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// POST /api/alerts
pub async fn create_alert(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(invalid_body)?;
    let new_alert = parse_new_alert(&body)?;
    let alert = state.store.create_alert(new_alert).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Alert created successfully",
            "alert": alert,
        })),
    ))
}

/// DELETE /api/alerts/{id}
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_alert_id(&id)?;
    let alert = state.store.delete_alert(id).await?;

    Ok(Json(json!({
        "message": "Alert deleted successfully",
        "alert_id": alert.id,
        "description": alert.description,
    })))
}

/// GET /api/alerts/status
pub async fn triggered_alerts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = state.store.list_triggered().await?;
    let message = if alerts.is_empty() {
        "No alerts are currently triggered".to_string()
    } else {
        format!("{} alert(s) are currently triggered", alerts.len())
    };

    Ok(Json(json!({
        "count": alerts.len(),
        "triggered_alerts": alerts,
        "message": message,
    })))
}

/// PUT /api/alerts/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_alert_id(&id)?;
    let Json(body) = body.map_err(invalid_body)?;

    let is_triggered = body
        .get("is_triggered")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::validation("is_triggered must be a boolean"))?;
    let current_value = body
        .get("current_value")
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::validation("current_value must be a number"))?;
    let checked_at = match body.get("checked_at") {
        None | Some(Value::Null) => Utc::now(),
        Some(Value::String(raw)) => parse_checked_at(raw)
            .ok_or_else(|| ApiError::validation("checked_at must be an ISO 8601 timestamp"))?,
        Some(_) => return Err(ApiError::validation("checked_at must be a string")),
    };

    let status = state
        .store
        .upsert_status(id, is_triggered, checked_at, Some(current_value))
        .await?;

    Ok(Json(json!({
        "message": "Alert status updated successfully",
        "alert_id": status.alert_id,
        "is_triggered": status.is_triggered,
        "current_value": status.current_value,
        "checked_at": status.checked_at,
    })))
}

/// POST /api/alerts/evaluate
pub async fn evaluate_alerts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let results = state
        .scheduler
        .run_now()
        .await
        .map_err(|e| ApiError::internal("Failed to evaluate alerts", e))?;

    Ok(Json(json!({
        "message": "Alert evaluation completed",
        "results": results,
    })))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::validation_with(
        "Invalid JSON body",
        json!({ "message": rejection.body_text() }),
    )
}

fn parse_alert_id(raw: &str) -> Result<i32, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation("Invalid alert ID")),
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`
/// taken as UTC.
fn parse_checked_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|t| t.and_utc())
}

fn parse_new_alert(body: &Map<String, Value>) -> Result<NewAlert, ApiError> {
    let present = |key: &str| body.get(key).is_some_and(|v| !v.is_null());
    if !REQUIRED_FIELDS.iter().all(|key| present(*key)) {
        return Err(ApiError::validation_with(
            "Missing required fields",
            json!({
                "required": REQUIRED_FIELDS,
                "received": body.keys().collect::<Vec<_>>(),
            }),
        ));
    }

    let lat = body["lat"]
        .as_f64()
        .filter(|lat| (-90.0..=90.0).contains(lat))
        .ok_or_else(|| ApiError::validation("Latitude must be a number between -90 and 90"))?;
    let lon = body["lon"]
        .as_f64()
        .filter(|lon| (-180.0..=180.0).contains(lon))
        .ok_or_else(|| ApiError::validation("Longitude must be a number between -180 and 180"))?;
    let threshold = body["threshold"]
        .as_f64()
        .filter(|t| t.is_finite())
        .ok_or_else(|| ApiError::validation("Threshold must be a number"))?;

    let operator = body["operator"]
        .as_str()
        .and_then(|op| op.parse::<Operator>().ok())
        .ok_or_else(|| {
            ApiError::validation_with(
                "Invalid operator",
                json!({ "valid": Operator::ALL.map(|op| op.as_str()) }),
            )
        })?;
    let parameter = body["parameter"]
        .as_str()
        .and_then(|p| p.parse::<Parameter>().ok())
        .ok_or_else(|| {
            ApiError::validation_with(
                "Invalid parameter",
                json!({ "valid": Parameter::ALL.map(|p| p.as_str()) }),
            )
        })?;

    let description = match body.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ApiError::validation("Description must be a string")),
    };

    Ok(NewAlert {
        lat,
        lon,
        parameter,
        operator,
        threshold,
        description,
    })
}
