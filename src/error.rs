//! Error types for the alert engine.

use thiserror::Error;

/// Alert/delivery persistence failures. Fatal for the current run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("bson serialization error: {0}")]
    BsonSer(#[from] mongodb::bson::ser::Error),

    #[error("alert store lock poisoned")]
    Poisoned,
}

/// A domain snapshot source could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("snapshot source unavailable: {0}")]
    Unavailable(String),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// A snapshot entity could not be evaluated. The entity is skipped.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("field `{field}` is not a valid number: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// A channel adapter failed to deliver.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("an alert scan is already running")]
    AlreadyRunning,
}
