use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    lat: Option<String>,
    lon: Option<String>,
}

/// GET /api/weather?lat=&lon=
pub async fn current_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(lat), Some(lon)) = (non_blank(query.lat), non_blank(query.lon)) else {
        return Err(ApiError::validation_with(
            "Missing required parameters",
            json!({ "required": ["lat", "lon"] }),
        ));
    };

    let lat = parse_coordinate(&lat, 90.0).ok_or_else(|| ApiError::validation("Invalid latitude"))?;
    let lon =
        parse_coordinate(&lon, 180.0).ok_or_else(|| ApiError::validation("Invalid longitude"))?;

    if !state.weather.is_configured() {
        return Err(crate::weather::WeatherError::Unconfigured.into());
    }

    let weather = state.weather.fetch(lat, lon).await?;

    Ok(Json(json!({
        "location": { "lat": lat, "lon": lon },
        "weather": weather,
    })))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_coordinate(raw: &str, bound: f64) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (-bound..=bound).contains(v))
}
