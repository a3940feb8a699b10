use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use tracing::error;

use crate::store::StoreError;
use crate::weather::WeatherError;

/// Failures surfaced to HTTP clients. Every variant renders as a JSON body
/// with at least `error` and `message`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{error}")]
    Validation { error: String, extra: Map<String, Value> },

    #[error("{0}")]
    NotFound(String),

    #[error("maximum alert limit reached ({current}/{max})")]
    CapacityExceeded { current: i64, max: i64 },

    #[error("{error}: {message}")]
    UpstreamUnavailable { error: String, message: String },

    #[error("{error}: {message}")]
    Internal { error: String, message: String },
}

impl ApiError {
    pub fn validation(error: impl Into<String>) -> Self {
        Self::Validation {
            error: error.into(),
            extra: Map::new(),
        }
    }

    pub fn validation_with(error: impl Into<String>, extra: Value) -> Self {
        let extra = match extra {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::Validation {
            error: error.into(),
            extra,
        }
    }

    pub fn internal(error: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            error: error.into(),
            message: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CapacityExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation { error, extra } => {
                let mut body = extra;
                body.insert("error".to_string(), Value::String(error.clone()));
                body.entry("message".to_string())
                    .or_insert(Value::String(error));
                Value::Object(body)
            }
            Self::NotFound(message) => json!({ "error": message, "message": message }),
            Self::CapacityExceeded { current, max } => json!({
                "error": "Maximum alert limit reached",
                "message": format!(
                    "You can only have up to {max} alerts. Please delete an existing alert first."
                ),
                "current_count": current,
                "max_allowed": max,
            }),
            Self::UpstreamUnavailable { error, message } => {
                json!({ "error": error, "message": message })
            }
            Self::Internal { error, message } => {
                error!(error = %error, cause = %message, "Request failed");
                json!({ "error": error, "message": message })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound("Alert not found".to_string()),
            StoreError::CapacityExceeded { current, max } => {
                Self::CapacityExceeded { current, max }
            }
            StoreError::Database(e) => Self::internal("Database error", e),
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::Unconfigured => Self::UpstreamUnavailable {
                error: "Weather service not configured".to_string(),
                message: "Please set TOMORROW_API_KEY environment variable".to_string(),
            },
            WeatherError::Network(_) | WeatherError::Timeout(_) => Self::UpstreamUnavailable {
                error: "Weather service unavailable".to_string(),
                message: err.to_string(),
            },
            WeatherError::Upstream { .. } | WeatherError::InvalidResponse(_) => {
                Self::internal("Failed to fetch weather data", err)
            }
        }
    }
}
