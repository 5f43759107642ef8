use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Time of day used for `sunrise`/`sunset` when the provider has no value.
pub const DEFAULT_TIME_OF_DAY: &str = "00:00:00";

/// One day of weather at the configured point, as written to `WEATHER_DATA`.
///
/// Every field is always populated; values the provider did not report hold
/// the defaults from [`WeatherRecord::with_defaults`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub weather_code: i64,
    pub temperature_2m_max: f64,        // °C
    pub temperature_2m_min: f64,        // °C
    pub apparent_temperature_max: f64,  // °C
    pub apparent_temperature_min: f64,  // °C
    pub sunrise: String,                // HH:MM:SS
    pub sunset: String,                 // HH:MM:SS
    pub daylight_duration: f64,         // seconds
    pub sunshine_duration: f64,         // seconds
    pub uv_index_max: i64,
}

impl WeatherRecord {
    /// A record for `date` with every measured field at its default.
    pub fn with_defaults(date: NaiveDate) -> Self {
        Self {
            date,
            weather_code: 0,
            temperature_2m_max: 0.0,
            temperature_2m_min: 0.0,
            apparent_temperature_max: 0.0,
            apparent_temperature_min: 0.0,
            sunrise: DEFAULT_TIME_OF_DAY.to_string(),
            sunset: DEFAULT_TIME_OF_DAY.to_string(),
            daylight_duration: 0.0,
            sunshine_duration: 0.0,
            uv_index_max: 0,
        }
    }
}
