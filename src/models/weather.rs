use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Parameter;

/// Current conditions at one location, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSample {
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::WindSpeed => self.wind_speed,
            Parameter::Precipitation => self.precipitation,
        }
    }
}
