use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use super::AppState;

/// GET /
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Hello World!",
        "timestamp": Utc::now(),
        "service": "Weather Alert System API",
    }))
}

/// GET /health
///
/// Liveness of the process plus a database probe. Always answers 200 while the
/// process is up; a failed probe is reported in `database.status`.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => json!({ "status": "connected", "timestamp": Utc::now() }),
        Err(e) => json!({
            "status": "disconnected",
            "error": e.to_string(),
            "timestamp": Utc::now(),
        }),
    };

    Json(json!({
        "status": "OK",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "timestamp": Utc::now(),
        "database": database,
        "scheduler": state.scheduler.status(),
    }))
}

/// GET /api/scheduler
pub async fn scheduler_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.status())
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {} not found", uri.path()),
        })),
    )
}
