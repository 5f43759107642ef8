use crate::http::error::RetrievalError;
use crate::types::daily_variable::DailyVariable;
use thiserror::Error;

/// The response does not fit the shape the fetcher relies on.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Response body is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response contains no location results")]
    NoResults,

    #[error("Response has no 'daily' block")]
    MissingDailyBlock,

    #[error("Value {value} for '{variable}' cannot be read as {expected}")]
    Malformed {
        variable: DailyVariable,
        value: serde_json::Value,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
