use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BerthError {
    #[error("No destination clusters available for placement")]
    NoClustersAvailable,

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Invalid interval: end {end} is not after start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Insufficient resources: requested {requested}, available {available}")]
    InsufficientResources { requested: String, available: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type BerthResult<T> = std::result::Result<T, BerthError>;
