//! The two scheduler-facing steps, fetch then load, and a driver that runs
//! them in order for one day.
//!
//! Runs never retry the load step and never cancel themselves; a failed run is
//! reported back with the terminal [`RunState`] it reached, and re-running the
//! day is left to whoever scheduled it.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetcher::weather_fetcher::WeatherFetcher;
use crate::handoff::store::{HandoffStore, InMemoryHandoff, RunId};
use crate::loader::weather_loader::WeatherLoader;
use crate::types::run_state::RunState;
use crate::types::weather_record::WeatherRecord;
use crate::utils::target_date_for;
use chrono::{DateTime, TimeZone};
use log::{error, info, warn};
use thiserror::Error;

/// Handoff key under which the fetch step publishes its record.
pub const WEATHER_DATA_KEY: &str = "weather_data";

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: RunState,
    pub record: WeatherRecord,
}

/// A run that ended in `FETCH_FAILED` or `LOAD_FAILED`.
#[derive(Debug, Error)]
#[error("Run {run_id} ended in {state}")]
pub struct RunFailure {
    pub run_id: RunId,
    pub state: RunState,
    #[source]
    pub source: PipelineError,
}

/// Tracks one run through the state machine and logs each step.
struct RunTracker<'a> {
    run_id: &'a RunId,
    state: RunState,
}

impl<'a> RunTracker<'a> {
    fn new(run_id: &'a RunId) -> Self {
        Self {
            run_id,
            state: RunState::Scheduled,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::IllegalTransition {
                run_id: self.run_id.to_string(),
                from: self.state,
                to: next,
            });
        }
        info!("Run {}: {} -> {}", self.run_id, self.state, next);
        self.state = next;
        Ok(())
    }

    fn fail(mut self, next: RunState, source: PipelineError) -> RunFailure {
        error!("Run {} failed: {}", self.run_id, source);
        let source = match self.advance(next) {
            Ok(()) => source,
            Err(illegal) => illegal,
        };
        RunFailure {
            run_id: self.run_id.clone(),
            state: self.state,
            source,
        }
    }
}

pub struct DailyPipeline<H: HandoffStore = InMemoryHandoff> {
    fetcher: WeatherFetcher,
    loader: WeatherLoader,
    handoff: H,
}

impl DailyPipeline<InMemoryHandoff> {
    /// Builds the fetcher and loader from `config` and makes sure the
    /// destination table exists.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let fetcher = WeatherFetcher::from_config(config).await?;
        let loader = WeatherLoader::new(config.duckdb_path.clone());
        loader.ensure_table().await?;
        Ok(Self::new(fetcher, loader, InMemoryHandoff::new()))
    }
}

impl<H: HandoffStore> DailyPipeline<H> {
    pub fn new(fetcher: WeatherFetcher, loader: WeatherLoader, handoff: H) -> Self {
        Self {
            fetcher,
            loader,
            handoff,
        }
    }

    pub fn handoff(&self) -> &H {
        &self.handoff
    }

    pub fn loader(&self) -> &WeatherLoader {
        &self.loader
    }

    /// Step 1: fetch the day before `invocation` and publish the record for `run_id`.
    pub async fn fetch_step<Tz: TimeZone>(
        &self,
        run_id: &RunId,
        invocation: &DateTime<Tz>,
    ) -> Result<WeatherRecord, PipelineError> {
        let target_date = target_date_for(invocation);
        info!("Run {}: fetching weather for {}", run_id, target_date);
        let record = self.fetcher.fetch(target_date).await?;
        self.handoff.publish(run_id, WEATHER_DATA_KEY, &record)?;
        Ok(record)
    }

    /// Step 2: read the record published for `run_id` and insert it.
    pub async fn load_step(&self, run_id: &RunId) -> Result<WeatherRecord, PipelineError> {
        let record: WeatherRecord = self.handoff.retrieve(run_id, WEATHER_DATA_KEY)?;
        self.loader.load(&record).await?;
        Ok(record)
    }

    /// Runs both steps; the load step only starts once the fetch step succeeded.
    pub async fn run<Tz: TimeZone>(
        &self,
        run_id: &RunId,
        invocation: &DateTime<Tz>,
    ) -> Result<RunReport, RunFailure> {
        let result = self.drive(run_id, invocation).await;
        if let Err(e) = self.handoff.discard(run_id) {
            warn!("Run {}: failed to discard handoff values: {}", run_id, e);
        }
        result
    }

    async fn drive<Tz: TimeZone>(
        &self,
        run_id: &RunId,
        invocation: &DateTime<Tz>,
    ) -> Result<RunReport, RunFailure> {
        let mut tracker = RunTracker::new(run_id);

        if let Err(e) = tracker.advance(RunState::Fetching) {
            return Err(tracker.fail(RunState::FetchFailed, e));
        }
        if let Err(e) = self.fetch_step(run_id, invocation).await {
            return Err(tracker.fail(RunState::FetchFailed, e));
        }
        let advanced = tracker
            .advance(RunState::Fetched)
            .and_then(|()| tracker.advance(RunState::Loading));
        if let Err(e) = advanced {
            return Err(tracker.fail(RunState::LoadFailed, e));
        }

        let record = match self.load_step(run_id).await {
            Ok(record) => record,
            Err(e) => return Err(tracker.fail(RunState::LoadFailed, e)),
        };
        if let Err(e) = tracker.advance(RunState::Done) {
            return Err(tracker.fail(RunState::LoadFailed, e));
        }

        Ok(RunReport {
            run_id: run_id.clone(),
            state: tracker.state,
            record,
        })
    }
}
