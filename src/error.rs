use crate::fetcher::error::{FetchError, SchemaError};
use crate::handoff::error::HandoffError;
use crate::http::error::{CacheError, RetrievalError};
use crate::loader::error::PersistenceError;
use crate::types::run_state::RunState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("Run {run_id} cannot move from {from} to {to}")]
    IllegalTransition {
        run_id: String,
        from: RunState,
        to: RunState,
    },
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Retrieval(e) => PipelineError::Retrieval(e),
            FetchError::Schema(e) => PipelineError::Schema(e),
        }
    }
}
