pub mod alert;
pub mod status;
pub mod weather;

pub use alert::{AlertDefinition, AlertView, NewAlert, Operator, Parameter};
pub use status::AlertStatus;
pub use weather::WeatherSample;
