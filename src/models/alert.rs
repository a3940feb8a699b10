use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Weather measurement an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parameter {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "windSpeed")]
    WindSpeed,
    #[serde(rename = "precipitation")]
    Precipitation,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::WindSpeed,
        Parameter::Precipitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::WindSpeed => "windSpeed",
            Self::Precipitation => "precipitation",
        }
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown weather parameter: {s}"))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied between the observed value and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "=")]
    Equal,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterEqual,
        Operator::LessEqual,
        Operator::Equal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Equal => "=",
        }
    }

    /// `Equal` is exact float equality, no tolerance.
    #[allow(clippy::float_cmp)]
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator: {s}"))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored alert. `parameter` and `operator` are kept as the raw column text;
/// the evaluator interprets them and reports rows it cannot understand.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AlertDefinition {
    pub id: i32,
    pub lat: f64,
    pub lon: f64,
    pub parameter: String,
    pub operator: String,
    pub threshold: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated alert waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub lat: f64,
    pub lon: f64,
    pub parameter: Parameter,
    pub operator: Operator,
    pub threshold: f64,
    pub description: Option<String>,
}

/// An alert joined with its most recent status, if it has been evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AlertView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub alert: AlertDefinition,
    pub is_triggered: Option<bool>,
    pub current_value: Option<f64>,
    pub checked_at: Option<DateTime<Utc>>,
}
