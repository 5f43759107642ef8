use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("No value under '{key}' for run {run_id}")]
    Missing { run_id: String, key: String },

    #[error("Failed to encode value for '{key}'")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode value under '{key}'")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Handoff store lock was poisoned")]
    Poisoned,
}
