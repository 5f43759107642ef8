//! Defines the ten daily-aggregate variables requested from Open-Meteo, in the
//! order they are sent in the `daily` query parameter.

use std::fmt;

/// How the value of a [`DailyVariable`] is coerced before it lands in a
/// [`crate::WeatherRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Whole number; fractional values from the provider are truncated toward zero.
    Integer,
    /// Floating point number.
    Float,
    /// Time of day rendered as `HH:MM:SS`.
    TimeOfDay,
}

/// A daily-aggregate weather metric reported once per calendar day.
///
/// The discriminant order is the request order. Open-Meteo aligns its response
/// slots with the names sent in the request, so this order is also the order
/// values are extracted and the order of the destination columns after `DATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyVariable {
    /// WMO weather interpretation code.
    WeatherCode,
    /// Maximum air temperature at 2 meters (°C).
    Temperature2mMax,
    /// Minimum air temperature at 2 meters (°C).
    Temperature2mMin,
    /// Maximum apparent ("feels like") temperature (°C).
    ApparentTemperatureMax,
    /// Minimum apparent ("feels like") temperature (°C).
    ApparentTemperatureMin,
    /// Time of sunrise.
    Sunrise,
    /// Time of sunset.
    Sunset,
    /// Daylight duration in seconds.
    DaylightDuration,
    /// Sunshine duration in seconds.
    SunshineDuration,
    /// Maximum UV index.
    UvIndexMax,
}

impl DailyVariable {
    /// All variables in request order.
    pub const ALL: [DailyVariable; 10] = [
        DailyVariable::WeatherCode,
        DailyVariable::Temperature2mMax,
        DailyVariable::Temperature2mMin,
        DailyVariable::ApparentTemperatureMax,
        DailyVariable::ApparentTemperatureMin,
        DailyVariable::Sunrise,
        DailyVariable::Sunset,
        DailyVariable::DaylightDuration,
        DailyVariable::SunshineDuration,
        DailyVariable::UvIndexMax,
    ];

    /// The name Open-Meteo uses for this variable, both in the request and as
    /// the key of its slot in the `daily` block of the response.
    pub fn name(&self) -> &'static str {
        match self {
            DailyVariable::WeatherCode => "weather_code",
            DailyVariable::Temperature2mMax => "temperature_2m_max",
            DailyVariable::Temperature2mMin => "temperature_2m_min",
            DailyVariable::ApparentTemperatureMax => "apparent_temperature_max",
            DailyVariable::ApparentTemperatureMin => "apparent_temperature_min",
            DailyVariable::Sunrise => "sunrise",
            DailyVariable::Sunset => "sunset",
            DailyVariable::DaylightDuration => "daylight_duration",
            DailyVariable::SunshineDuration => "sunshine_duration",
            DailyVariable::UvIndexMax => "uv_index_max",
        }
    }

    /// Column name in the `WEATHER_DATA` table.
    pub fn column(&self) -> String {
        self.name().to_ascii_uppercase()
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            DailyVariable::WeatherCode | DailyVariable::UvIndexMax => ValueKind::Integer,
            DailyVariable::Sunrise | DailyVariable::Sunset => ValueKind::TimeOfDay,
            _ => ValueKind::Float,
        }
    }

    /// Value of the `daily` query parameter: every variable name, comma-joined, in order.
    pub fn request_param() -> String {
        Self::ALL
            .iter()
            .map(|v| v.name())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for DailyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_param_keeps_declared_order() {
        assert_eq!(
            DailyVariable::request_param(),
            "weather_code,temperature_2m_max,temperature_2m_min,apparent_temperature_max,\
             apparent_temperature_min,sunrise,sunset,daylight_duration,sunshine_duration,\
             uv_index_max"
        );
    }

    #[test]
    fn test_kinds_and_columns() {
        assert_eq!(DailyVariable::WeatherCode.kind(), ValueKind::Integer);
        assert_eq!(DailyVariable::UvIndexMax.kind(), ValueKind::Integer);
        assert_eq!(DailyVariable::Sunset.kind(), ValueKind::TimeOfDay);
        assert_eq!(DailyVariable::SunshineDuration.kind(), ValueKind::Float);
        assert_eq!(DailyVariable::Temperature2mMax.column(), "TEMPERATURE_2M_MAX");
    }
}
