use chrono::Local;
use log::{error, info};
use std::process::ExitCode;
use weather_ingest::{DailyPipeline, PipelineConfig, RunId};

/// One scheduled run: fetch yesterday's weather and append it to WEATHER_DATA.
/// Meant to be triggered once a day; a non-zero exit marks the day as failed.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match DailyPipeline::from_config(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to set up pipeline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let now = Local::now();
    let run_id = RunId::scheduled(now.date_naive());
    match pipeline.run(&run_id, &now).await {
        Ok(report) => {
            info!("Run {} finished in {}", report.run_id, report.state);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!("{}: {:?}", failure, failure.source);
            ExitCode::FAILURE
        }
    }
}
