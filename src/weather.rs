use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::WeatherSample;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather API key not configured")]
    Unconfigured,

    #[error("network error: unable to reach weather API ({0})")]
    Network(String),

    #[error("weather API did not respond within {0:?}")]
    Timeout(Duration),

    #[error("weather API error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("invalid response from weather API: {0}")]
    InvalidResponse(String),
}

/// Source of current conditions for a coordinate pair. One call, one remote
/// request: implementations do not retry or cache.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSample, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: RealtimeData,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    time: DateTime<Utc>,
    values: RealtimeValues,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeValues {
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    #[serde(alias = "precipitationIntensity")]
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

/// Client for the Tomorrow.io realtime endpoint.
pub struct TomorrowClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl TomorrowClient {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        if api_key.is_none() {
            warn!("TOMORROW_API_KEY not set. Weather data will not be available.");
        }
        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> WeatherError {
        if err.is_timeout() {
            WeatherError::Timeout(self.timeout)
        } else if err.is_decode() {
            WeatherError::InvalidResponse(err.to_string())
        } else {
            WeatherError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl WeatherProvider for TomorrowClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSample, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::Unconfigured)?;
        let location = format!("{},{}", lat, lon);

        debug!(lat, lon, "Fetching weather data");

        let response = self
            .http
            .get(format!("{}/realtime", self.base_url))
            .query(&[
                ("location", location.as_str()),
                ("apikey", api_key),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UpstreamErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: RealtimeResponse = response.json().await.map_err(|e| self.classify(e))?;
        let values = body.data.values;

        Ok(WeatherSample {
            temperature: values.temperature,
            humidity: values.humidity,
            wind_speed: values.wind_speed,
            precipitation: values.precipitation,
            cloud_cover: values.cloud_cover,
            observed_at: body.data.time,
        })
    }
}
