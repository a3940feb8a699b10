mod api;
mod config;
mod db;
mod evaluator;
mod models;
mod scheduler;
mod store;
mod weather;

use anyhow::anyhow;
use config::AppConfig;
use evaluator::AlertEvaluator;
use scheduler::Scheduler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use store::{AlertStore, PgAlertStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use weather::{TomorrowClient, WeatherProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Weather Alert Service...");

    // Init DB. An unreachable database leaves the API up without the scheduler.
    let (pool, db_ready) = match db::init_pool(&config.database_url, config.db_max_connections).await
    {
        Ok(pool) => {
            info!("Connected to database");
            match db::init_schema(&pool).await {
                Ok(()) => {
                    info!("Database schema initialized");
                    (pool, true)
                }
                Err(e) => {
                    error!(error = %e, "Database schema initialization failed");
                    (pool, false)
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "Database connection failed. Some features may not work.");
            (
                db::lazy_pool(&config.database_url, config.db_max_connections)?,
                false,
            )
        }
    };

    let store: Arc<dyn AlertStore> = Arc::new(PgAlertStore::new(pool));
    let weather: Arc<dyn WeatherProvider> = Arc::new(TomorrowClient::new(
        config.weather_api_key.clone(),
        config.weather_api_url.as_str(),
        Duration::from_secs(config.weather_timeout_secs),
    )?);

    let evaluator = AlertEvaluator::new(store.clone(), weather.clone());
    let scheduler = Arc::new(
        Scheduler::new(
            evaluator,
            &config.cron_expression,
            Duration::from_secs(config.initial_evaluation_delay_secs),
        )
        .map_err(|e| anyhow!("invalid CRON_EXPRESSION '{}': {}", config.cron_expression, e))?,
    );

    if db_ready {
        scheduler.start();
    } else {
        warn!("Alert evaluation scheduler not started: database unavailable");
    }

    let app = api::router(
        api::AppState::new(store, weather, scheduler.clone()),
        &config.cors_origins,
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
