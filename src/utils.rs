use chrono::{DateTime, NaiveDate, TimeZone};
use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "weather_ingest_cache";

pub fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}

/// The day a run reports on: the calendar day before `invocation`, in the
/// invocation's own time zone.
pub fn target_date_for<Tz: TimeZone>(invocation: &DateTime<Tz>) -> NaiveDate {
    let today = invocation.date_naive();
    today.pred_opt().unwrap_or(today)
}
