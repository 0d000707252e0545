//! Error types for esg-core

use thiserror::Error;

/// Result type alias for esg-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the core data model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unknown domain code
    #[error("Unknown domain code: {0}")]
    InvalidDomain(String),

    /// Unknown report mode
    #[error("Unknown report mode: {0} (expected 'weekly' or 'daily')")]
    InvalidMode(String),

    /// Start date after end date
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },
}
