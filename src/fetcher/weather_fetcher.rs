use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetcher::error::{FetchError, SchemaError};
use crate::fetcher::extract::{float, integer, time_of_day};
use crate::http::cache::ResponseCache;
use crate::http::error::RetrievalError;
use crate::http::session::{CachedSession, ResilientClient};
use crate::types::daily_variable::DailyVariable;
use crate::types::weather_record::{WeatherRecord, DEFAULT_TIME_OF_DAY};
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::Url;
use serde_json::{Map, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Retrieves one day of daily-aggregate weather for a fixed point.
#[derive(Debug)]
pub struct WeatherFetcher {
    client: ResilientClient,
    endpoint: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
}

impl WeatherFetcher {
    pub fn new(client: ResilientClient, config: &PipelineConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone.clone(),
        }
    }

    /// Builds the cache, session and retry layers described by `config`.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let cache_dir = config.resolved_cache_dir()?;
        let cache = ResponseCache::new(&cache_dir, config.cache_ttl).await?;
        let session = CachedSession::new(cache, config.request_timeout)?;
        let client = ResilientClient::new(session, config.retry);
        Ok(Self::new(client, config))
    }

    /// Request URL for `target_date`. The query string is part of the cache key.
    pub fn request_url(&self, target_date: NaiveDate) -> Result<Url, RetrievalError> {
        let date = target_date.format(DATE_FORMAT).to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("start_date", date.clone()),
                ("end_date", date),
                ("daily", DailyVariable::request_param()),
                ("timezone", self.timezone.clone()),
            ],
        )
        .map_err(|e| RetrievalError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }

    /// Fetches and normalizes the observations for `target_date`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Retrieval`] if the provider stays unreachable or rejects the
    /// request; [`FetchError::Schema`] if the body is not a daily-aggregate
    /// response or a reported value has the wrong type.
    pub async fn fetch(&self, target_date: NaiveDate) -> Result<WeatherRecord, FetchError> {
        let url = self.request_url(target_date)?;
        let body = self.client.get(&url).await?;
        let record = match record_from_body(&body, target_date) {
            Ok(record) => record,
            Err(e) => {
                // Don't replay an unusable body from the cache on the next run.
                self.client.evict(&url).await;
                return Err(e);
            }
        };
        info!("Fetched weather for {}: {:?}", target_date, record);
        Ok(record)
    }
}

/// Normalizes a provider response body into a [`WeatherRecord`] dated `target_date`.
pub fn record_from_body(body: &[u8], target_date: NaiveDate) -> Result<WeatherRecord, FetchError> {
    let response: Value = serde_json::from_slice(body).map_err(SchemaError::from)?;

    let result = match &response {
        Value::Array(results) => results.first().ok_or(SchemaError::NoResults)?,
        Value::Object(_) => &response,
        _ => return Err(SchemaError::NoResults.into()),
    };

    if result.get("error").and_then(Value::as_bool) == Some(true) {
        let reason = result
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Err(RetrievalError::Provider { reason }.into());
    }

    let daily = result
        .get("daily")
        .and_then(Value::as_object)
        .ok_or(SchemaError::MissingDailyBlock)?;

    warn_on_date_mismatch(daily, target_date);
    Ok(record_from_daily(daily, target_date)?)
}

fn record_from_daily(
    daily: &Map<String, Value>,
    target_date: NaiveDate,
) -> Result<WeatherRecord, SchemaError> {
    use DailyVariable::*;

    let int = |v: DailyVariable| integer(daily, v).or_default(0, v, "an integer");
    let num = |v: DailyVariable| float(daily, v).or_default(0.0, v, "a number");
    let time = |v: DailyVariable| {
        time_of_day(daily, v).or_default(DEFAULT_TIME_OF_DAY.to_string(), v, "a time of day")
    };

    Ok(WeatherRecord {
        date: target_date,
        weather_code: int(WeatherCode)?,
        temperature_2m_max: num(Temperature2mMax)?,
        temperature_2m_min: num(Temperature2mMin)?,
        apparent_temperature_max: num(ApparentTemperatureMax)?,
        apparent_temperature_min: num(ApparentTemperatureMin)?,
        sunrise: time(Sunrise)?,
        sunset: time(Sunset)?,
        daylight_duration: num(DaylightDuration)?,
        sunshine_duration: num(SunshineDuration)?,
        uv_index_max: int(UvIndexMax)?,
    })
}

// The record is always dated with the requested day; the echoed date is only checked.
fn warn_on_date_mismatch(daily: &Map<String, Value>, target_date: NaiveDate) {
    let echoed = daily
        .get("time")
        .and_then(Value::as_array)
        .and_then(|times| times.first())
        .and_then(Value::as_str);
    if let Some(echoed) = echoed {
        if echoed != target_date.format(DATE_FORMAT).to_string() {
            warn!(
                "Provider reported date {} for a request on {}",
                echoed, target_date
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn std::error::Error>> {
        NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| "bad date".into())
    }

    fn full_response() -> Value {
        json!({
            "latitude": 51.46,
            "longitude": -2.6,
            "timezone": "GMT",
            "daily": {
                "time": ["2024-07-14"],
                "weather_code": [2],
                "temperature_2m_max": [15.2],
                "temperature_2m_min": [8.1],
                "apparent_temperature_max": [14.0],
                "apparent_temperature_min": [7.5],
                "sunrise": ["06:12:00"],
                "sunset": ["19:45:00"],
                "daylight_duration": [45000.0],
                "sunshine_duration": [30000.0],
                "uv_index_max": [5]
            }
        })
    }

    fn expected_full(target: NaiveDate) -> WeatherRecord {
        WeatherRecord {
            date: target,
            weather_code: 2,
            temperature_2m_max: 15.2,
            temperature_2m_min: 8.1,
            apparent_temperature_max: 14.0,
            apparent_temperature_min: 7.5,
            sunrise: "06:12:00".to_string(),
            sunset: "19:45:00".to_string(),
            daylight_duration: 45000.0,
            sunshine_duration: 30000.0,
            uv_index_max: 5,
        }
    }

    #[test]
    fn test_full_response_maps_every_field() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 14)?;
        let body = serde_json::to_vec(&full_response())?;
        assert_eq!(record_from_body(&body, target)?, expected_full(target));
        Ok(())
    }

    #[test]
    fn test_empty_weather_code_defaults_to_zero() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 14)?;
        let mut response = full_response();
        response["daily"]["weather_code"] = json!([]);
        let record = record_from_body(&serde_json::to_vec(&response)?, target)?;

        let mut expected = expected_full(target);
        expected.weather_code = 0;
        assert_eq!(record, expected);
        Ok(())
    }

    #[test]
    fn test_every_field_defaults_when_absent() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 14)?;
        for variable in DailyVariable::ALL {
            for shape in [json!(null), json!([]), json!(3), json!([null])] {
                let mut response = full_response();
                response["daily"][variable.name()] = shape;
                let record = record_from_body(&serde_json::to_vec(&response)?, target)?;

                let mut expected = expected_full(target);
                let defaults = WeatherRecord::with_defaults(target);
                match variable {
                    DailyVariable::WeatherCode => expected.weather_code = defaults.weather_code,
                    DailyVariable::Temperature2mMax => expected.temperature_2m_max = 0.0,
                    DailyVariable::Temperature2mMin => expected.temperature_2m_min = 0.0,
                    DailyVariable::ApparentTemperatureMax => expected.apparent_temperature_max = 0.0,
                    DailyVariable::ApparentTemperatureMin => expected.apparent_temperature_min = 0.0,
                    DailyVariable::Sunrise => expected.sunrise = defaults.sunrise.clone(),
                    DailyVariable::Sunset => expected.sunset = defaults.sunset.clone(),
                    DailyVariable::DaylightDuration => expected.daylight_duration = 0.0,
                    DailyVariable::SunshineDuration => expected.sunshine_duration = 0.0,
                    DailyVariable::UvIndexMax => expected.uv_index_max = 0,
                }
                assert_eq!(record, expected, "{} as {}", variable, response["daily"][variable.name()]);
            }
        }

        // Removing the key altogether behaves the same.
        let mut response = full_response();
        if let Some(daily) = response["daily"].as_object_mut() {
            daily.remove("sunset");
        }
        let record = record_from_body(&serde_json::to_vec(&response)?, target)?;
        assert_eq!(record.sunset, "00:00:00");
        Ok(())
    }

    #[test]
    fn test_date_comes_from_the_request_not_the_provider() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 20)?;
        let body = serde_json::to_vec(&full_response())?; // echoes 2024-07-14
        assert_eq!(record_from_body(&body, target)?.date, target);
        Ok(())
    }

    #[test]
    fn test_first_result_of_an_array_is_used() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 14)?;
        let body = serde_json::to_vec(&json!([full_response(), {"daily": {}}]))?;
        assert_eq!(record_from_body(&body, target)?, expected_full(target));

        let empty = serde_json::to_vec(&json!([]))?;
        assert!(matches!(
            record_from_body(&empty, target),
            Err(FetchError::Schema(SchemaError::NoResults))
        ));
        Ok(())
    }

    #[test]
    fn test_schema_violations_surface() -> Result<(), Box<dyn std::error::Error>> {
        let target = date(2024, 7, 14)?;

        let mut response = full_response();
        response["daily"]["uv_index_max"] = json!(["high"]);
        assert!(matches!(
            record_from_body(&serde_json::to_vec(&response)?, target),
            Err(FetchError::Schema(SchemaError::Malformed {
                variable: DailyVariable::UvIndexMax,
                ..
            }))
        ));

        let no_daily = serde_json::to_vec(&json!({"latitude": 51.46}))?;
        assert!(matches!(
            record_from_body(&no_daily, target),
            Err(FetchError::Schema(SchemaError::MissingDailyBlock))
        ));

        assert!(matches!(
            record_from_body(b"<html>", target),
            Err(FetchError::Schema(SchemaError::InvalidJson(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_sends_the_fixed_query() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "51.4552"))
            .and(query_param("longitude", "-2.5966"))
            .and(query_param("start_date", "2024-07-14"))
            .and(query_param("end_date", "2024-07-14"))
            .and(query_param("daily", DailyVariable::request_param().as_str()))
            .and(query_param("timezone", "GMT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_response()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::builder()
            .endpoint(format!("{}/v1/forecast", server.uri()))
            .cache_dir(dir.path())
            .request_timeout(Duration::from_secs(5))
            .build();
        let fetcher = WeatherFetcher::from_config(&config).await?;

        let target = date(2024, 7, 14)?;
        assert_eq!(fetcher.fetch(target).await?, expected_full(target));
        Ok(())
    }

    #[tokio::test]
    async fn test_unusable_body_is_not_replayed_from_cache() -> Result<(), Box<dyn std::error::Error>>
    {
        let server = MockServer::start().await;
        let mut bad = full_response();
        bad["daily"]["temperature_2m_max"] = json!(["warm"]);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bad))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_response()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::builder()
            .endpoint(format!("{}/v1/forecast", server.uri()))
            .cache_dir(dir.path())
            .request_timeout(Duration::from_secs(5))
            .build();
        let fetcher = WeatherFetcher::from_config(&config).await?;

        let target = date(2024, 7, 14)?;
        assert!(matches!(
            fetcher.fetch(target).await,
            Err(FetchError::Schema(SchemaError::Malformed { .. }))
        ));
        assert_eq!(fetcher.fetch(target).await?, expected_full(target));
        // The good body is cached like any other.
        assert_eq!(fetcher.fetch(target).await?, expected_full(target));
        Ok(())
    }
}
