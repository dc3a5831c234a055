use thiserror::Error;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error: {source}")]
    Sqlx { source: sqlx::Error },

    /// Represents an operation that targeted a submission that does
    /// not exist.
    #[error("no submission with ID {0}")]
    NonExistentId(i32),

    /// Represents a payload that failed a field constraint. Detected
    /// before any persistence is attempted.
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// Represents a status value in the database that this version
    /// does not recognize.
    #[error("unrecognized status {0:?} in database")]
    UnrecognizedStatus(String),
}

/// Enumerates payload constraint violations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("invalid phone number: {0:?} (digits with an optional leading +, at least 5 characters)")]
    InvalidPhone(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("height {0} must be non-negative")]
    NegativeHeight(i32),

    #[error("{season} difficulty level {value:?} exceeds 2 characters")]
    LevelTooLong { season: &'static str, value: String },

    #[error("at least one image is required")]
    NoImages,
}

impl reject::Reject for BackendError {}
