use std::path::PathBuf;
use thiserror::Error;

/// The destination could not be reached or rejected the statement.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to open DuckDB database '{0}'")]
    Open(PathBuf, #[source] duckdb::Error),

    #[error("Failed to create table {table}")]
    CreateTable {
        table: &'static str,
        #[source]
        source: duckdb::Error,
    },

    #[error("Insert into {table} for {date} failed")]
    Insert {
        table: &'static str,
        date: chrono::NaiveDate,
        #[source]
        source: duckdb::Error,
    },

    #[error("Query against {table} failed")]
    Query {
        table: &'static str,
        #[source]
        source: duckdb::Error,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
