//! Pipeline configuration. The point, variables and resilience settings are
//! fixed defaults; the destination database is the only value read from the
//! environment.

use crate::error::PipelineError;
use crate::http::retry::RetryPolicy;
use crate::utils::get_cache_dir;
use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

pub const OPEN_METEO_HISTORICAL_URL: &str =
    "https://historical-forecast-api.open-meteo.com/v1/forecast";

/// Environment variable holding the path of the destination DuckDB file.
pub const DUCKDB_PATH_VAR: &str = "WEATHER_DUCKDB_PATH";

/// Settings for one [`crate::DailyPipeline`].
///
/// # Examples
///
/// ```
/// use weather_ingest::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .duckdb_path("/tmp/weather.duckdb")
///     .build();
/// assert_eq!(config.timezone, "GMT");
/// assert_eq!(config.retry.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PipelineConfig {
    #[builder(into, default = OPEN_METEO_HISTORICAL_URL.to_string())]
    pub endpoint: String,

    #[builder(default = 51.4552)]
    pub latitude: f64,

    #[builder(default = -2.5966)]
    pub longitude: f64,

    #[builder(into, default = "GMT".to_string())]
    pub timezone: String,

    /// Directory of the response cache. `None` resolves to the user cache directory.
    #[builder(into)]
    pub cache_dir: Option<PathBuf>,

    #[builder(default = Duration::from_secs(3600))]
    pub cache_ttl: Duration,

    #[builder(default)]
    pub retry: RetryPolicy,

    #[builder(default = Duration::from_secs(30))]
    pub request_timeout: Duration,

    #[builder(into, default = PathBuf::from("weather.duckdb"))]
    pub duckdb_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Defaults, with the destination taken from `WEATHER_DUCKDB_PATH`.
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, PipelineError> {
        // A missing .env file is fine; the variable may come from the real environment.
        let _ = dotenvy::dotenv();
        let duckdb_path =
            std::env::var(DUCKDB_PATH_VAR).map_err(|_| PipelineError::MissingEnv(DUCKDB_PATH_VAR))?;
        Ok(Self::builder().duckdb_path(duckdb_path).build())
    }

    /// The configured cache directory, or the default one under the user cache dir.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf, PipelineError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_cache_dir().ok_or(PipelineError::CacheDirResolution),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_bristol() {
        let config = PipelineConfig::default();
        assert_eq!(config.endpoint, OPEN_METEO_HISTORICAL_URL);
        assert_eq!(config.latitude, 51.4552);
        assert_eq!(config.longitude, -2.5966);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.retry, RetryPolicy::new(5, 0.2));
    }

    #[test]
    fn test_explicit_cache_dir_wins() -> Result<(), PipelineError> {
        let config = PipelineConfig::builder().cache_dir("/var/cache/wx").build();
        assert_eq!(config.resolved_cache_dir()?, PathBuf::from("/var/cache/wx"));
        Ok(())
    }
}
