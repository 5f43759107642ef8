//! Daily ingestion of Open-Meteo historical-forecast observations into DuckDB.
//!
//! One run fetches yesterday's daily aggregates for a fixed point through a
//! cached, retrying HTTP client, normalizes them into a [`WeatherRecord`] and
//! appends that record to the `WEATHER_DATA` table.
//!
//! ```no_run
//! use chrono::Local;
//! use weather_ingest::{DailyPipeline, PipelineConfig, RunId};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::builder().duckdb_path("weather.duckdb").build();
//! let pipeline = DailyPipeline::from_config(&config).await?;
//!
//! let now = Local::now();
//! let report = pipeline.run(&RunId::scheduled(now.date_naive()), &now).await?;
//! println!("{} -> {:?}", report.state, report.record);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fetcher;
mod handoff;
mod http;
mod loader;
mod pipeline;
mod types;
mod utils;

pub use config::{PipelineConfig, DUCKDB_PATH_VAR, OPEN_METEO_HISTORICAL_URL};
pub use error::PipelineError;
pub use pipeline::{DailyPipeline, RunFailure, RunReport, WEATHER_DATA_KEY};

pub use fetcher::error::{FetchError, SchemaError};
pub use fetcher::extract::Extracted;
pub use fetcher::weather_fetcher::{record_from_body, WeatherFetcher};

pub use handoff::error::HandoffError;
pub use handoff::store::{HandoffStore, InMemoryHandoff, RunId};

pub use http::cache::ResponseCache;
pub use http::error::{CacheError, RetrievalError};
pub use http::retry::RetryPolicy;
pub use http::session::{CachedSession, ResilientClient};

pub use loader::error::PersistenceError;
pub use loader::weather_loader::{WeatherLoader, TABLE_NAME};

pub use types::daily_variable::{DailyVariable, ValueKind};
pub use types::run_state::RunState;
pub use types::weather_record::{WeatherRecord, DEFAULT_TIME_OF_DAY};

pub use utils::target_date_for;
