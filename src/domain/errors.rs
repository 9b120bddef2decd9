//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Local fetch failed: {0}")]
    LocalFetch(String),

    #[error("Ratings fetch failed: {0}")]
    RatingsFetch(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The background load task panicked or was aborted before producing a report.
    #[error("Load worker failed: {0}")]
    Worker(String),
}
