//! Error kinds raised by the import engine and its store collaborator.
//!
//! Validation problems are not errors here: they are captured as
//! [`Failure`](crate::import::Failure) values and never abort a run.

use rocket_db_pools::sqlx;
use thiserror::Error;

use crate::import::coordinator::RunState;

/// Errors returned by an [`ImportStore`](crate::store::ImportStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unique constraint violated: {field} '{value}' already exists")]
    Conflict { field: &'static str, value: String },
    #[error("{field} longer than {max} characters")]
    ValueTooLong { field: &'static str, max: usize },
    #[error("bulk insert returned {actual} rows, expected {expected}")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fatal errors that stop an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import run is {0} and cannot be started")]
    InvalidState(RunState),
    #[error("company {0} does not exist")]
    UnknownCompany(i64),
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidRule {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("no free username for '{base}' after {attempts} attempts")]
    UsernameExhausted { base: String, attempts: usize },
    #[error("failed to write batch of {} rows (rows {}): {source}", .rows.len(), format_rows(.rows))]
    BatchWrite {
        rows: Vec<usize>,
        #[source]
        source: StoreError,
    },
    #[error("failed to record failure for row {row}: {source}")]
    FailureWrite {
        row: usize,
        #[source]
        source: StoreError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn format_rows(rows: &[usize]) -> String {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) if first != last => format!("{first}-{last}"),
        (Some(first), _) => first.to_string(),
        _ => "none".to_string(),
    }
}
