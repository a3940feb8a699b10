mod alerts;
mod error;
mod health;
mod weather;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::scheduler::Scheduler;
use crate::store::AlertStore;
use crate::weather::WeatherProvider;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AlertStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub scheduler: Arc<Scheduler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AlertStore>,
        weather: Arc<dyn WeatherProvider>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            store,
            weather,
            scheduler,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route(
            "/api/alerts",
            get(alerts::list_alerts).post(alerts::create_alert),
        )
        .route("/api/alerts/status", get(alerts::triggered_alerts))
        .route("/api/alerts/evaluate", post(alerts::evaluate_alerts))
        .route("/api/alerts/{id}", delete(alerts::delete_alert))
        .route("/api/alerts/{id}/status", put(alerts::update_status))
        .route("/api/weather", get(weather::current_weather))
        .route("/api/scheduler", get(health::scheduler_status))
        .fallback(health::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
