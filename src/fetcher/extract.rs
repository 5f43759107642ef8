//! Slot extraction from the `daily` block of an Open-Meteo response.
//!
//! Each variable's slot is an array aligned with `daily.time`; for a one-day
//! request the value is its first element. Extraction yields an explicit
//! [`Extracted`] so that "nothing reported" and "reported something unusable"
//! are separate branches: the first falls back to the variable's default, the
//! second is a [`SchemaError`].

use crate::fetcher::error::SchemaError;
use crate::types::daily_variable::DailyVariable;
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Present(T),
    /// Key missing, `null`, an empty array, a `null` first element, or a bare
    /// scalar where an array was expected.
    Absent,
    /// A value was reported but cannot be coerced to the variable's type.
    Malformed(Value),
}

impl<T> Extracted<T> {
    /// Folds `Absent` into `default` and `Malformed` into a [`SchemaError`].
    pub fn or_default(
        self,
        default: T,
        variable: DailyVariable,
        expected: &'static str,
    ) -> Result<T, SchemaError> {
        match self {
            Extracted::Present(value) => Ok(value),
            Extracted::Absent => Ok(default),
            Extracted::Malformed(value) => Err(SchemaError::Malformed {
                variable,
                value,
                expected,
            }),
        }
    }

    fn coerce<U>(self, f: impl FnOnce(&T) -> Option<U>) -> Extracted<U>
    where
        T: Into<Value>,
    {
        match self {
            Extracted::Present(value) => match f(&value) {
                Some(coerced) => Extracted::Present(coerced),
                None => Extracted::Malformed(value.into()),
            },
            Extracted::Absent => Extracted::Absent,
            Extracted::Malformed(value) => Extracted::Malformed(value),
        }
    }
}

/// The raw first value of `variable`'s slot.
pub fn slot(daily: &Map<String, Value>, variable: DailyVariable) -> Extracted<Value> {
    match daily.get(variable.name()) {
        Some(Value::Array(values)) => match values.first() {
            None | Some(Value::Null) => Extracted::Absent,
            Some(value) => Extracted::Present(value.clone()),
        },
        // Absent key, explicit null, or a scalar container.
        _ => Extracted::Absent,
    }
}

pub fn integer(daily: &Map<String, Value>, variable: DailyVariable) -> Extracted<i64> {
    slot(daily, variable).coerce(as_integer)
}

pub fn float(daily: &Map<String, Value>, variable: DailyVariable) -> Extracted<f64> {
    slot(daily, variable).coerce(|v| v.as_f64())
}

pub fn time_of_day(daily: &Map<String, Value>, variable: DailyVariable) -> Extracted<String> {
    slot(daily, variable).coerce(as_time_of_day)
}

/// Whole numbers pass through, fractional ones are truncated toward zero.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Accepts ISO-8601 local datetimes (`2024-07-15T05:30`), bare times
/// (`05:30`, `05:30:12`) and unix timestamps in seconds (read as UTC).
fn as_time_of_day(value: &Value) -> Option<String> {
    let time = match value {
        Value::String(s) => parse_time_of_day(s)?,
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0)?.time(),
        _ => return None,
    };
    Some(time.format(TIME_OF_DAY_FORMAT).to_string())
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.time())
        .or_else(|| {
            ["%H:%M:%S", "%H:%M"]
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn daily(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_absent_shapes_fall_back_to_default() {
        let block = daily(json!({
            "weather_code": [],
            "temperature_2m_max": 14.2,
            "temperature_2m_min": null,
            "apparent_temperature_max": [null],
            "sunrise": "2024-07-15T05:30",
        }));

        for variable in [
            DailyVariable::WeatherCode,
            DailyVariable::Temperature2mMax,
            DailyVariable::Temperature2mMin,
            DailyVariable::ApparentTemperatureMax,
            DailyVariable::ApparentTemperatureMin,
            DailyVariable::Sunrise,
        ] {
            assert_eq!(slot(&block, variable), Extracted::Absent, "{}", variable);
        }
        let weather_code = integer(&block, DailyVariable::WeatherCode).or_default(
            0,
            DailyVariable::WeatherCode,
            "an integer",
        );
        assert_eq!(weather_code.ok(), Some(0));
    }

    #[test]
    fn test_integers_truncate() {
        let block = daily(json!({ "weather_code": [2.0], "uv_index_max": [5.85] }));
        assert_eq!(integer(&block, DailyVariable::WeatherCode), Extracted::Present(2));
        assert_eq!(integer(&block, DailyVariable::UvIndexMax), Extracted::Present(5));
    }

    #[test]
    fn test_non_numeric_is_malformed() {
        let block = daily(json!({ "temperature_2m_max": ["warm"], "weather_code": [true] }));
        assert_eq!(
            float(&block, DailyVariable::Temperature2mMax),
            Extracted::Malformed(json!("warm"))
        );
        assert_eq!(
            integer(&block, DailyVariable::WeatherCode),
            Extracted::Malformed(json!(true))
        );

        let err = float(&block, DailyVariable::Temperature2mMax).or_default(
            0.0,
            DailyVariable::Temperature2mMax,
            "a number",
        );
        assert!(matches!(
            err,
            Err(SchemaError::Malformed {
                variable: DailyVariable::Temperature2mMax,
                ..
            })
        ));
    }

    #[test]
    fn test_times_are_normalized() {
        let block = daily(json!({
            "sunrise": ["2024-07-15T05:30"],
            "sunset": ["21:14:09"],
        }));
        assert_eq!(
            time_of_day(&block, DailyVariable::Sunrise),
            Extracted::Present("05:30:00".to_string())
        );
        assert_eq!(
            time_of_day(&block, DailyVariable::Sunset),
            Extracted::Present("21:14:09".to_string())
        );

        let unix = daily(json!({ "sunrise": [1721021400] }));
        assert_eq!(
            time_of_day(&unix, DailyVariable::Sunrise),
            Extracted::Present("05:30:00".to_string())
        );

        let garbage = daily(json!({ "sunset": ["dusk"] }));
        assert_eq!(
            time_of_day(&garbage, DailyVariable::Sunset),
            Extracted::Malformed(json!("dusk"))
        );
    }
}
