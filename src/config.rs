use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub weather_timeout_secs: u64,
    pub cron_expression: String,
    pub initial_evaluation_delay_secs: u64,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let db_name = env::var("DB_NAME").unwrap_or_else(|_| "weather_alerts".to_string());
                let db_user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
                let db_pwd = env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string());

                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    db_user, db_pwd, db_host, db_port, db_name
                )
            }
        };
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let weather_api_key = env::var("TOMORROW_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let weather_api_url = env::var("WEATHER_API_URL")
            .unwrap_or_else(|_| "https://api.tomorrow.io/v4/weather".to_string());
        let weather_timeout_secs = env::var("WEATHER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let cron_expression =
            env::var("CRON_EXPRESSION").unwrap_or_else(|_| "*/5 * * * *".to_string());
        // Fail before the server binds rather than on the first tick.
        crate::scheduler::parse_schedule(&cron_expression)
            .map_err(|e| anyhow!("invalid CRON_EXPRESSION '{}': {}", cron_expression, e))?;
        let initial_evaluation_delay_secs = env::var("INITIAL_EVALUATION_DELAY_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001,http://localhost:3000".to_string()),
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            db_max_connections,
            weather_api_key,
            weather_api_url,
            weather_timeout_secs,
            cron_expression,
            initial_evaluation_delay_secs,
            host,
            port,
            cors_origins,
            log_level,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
