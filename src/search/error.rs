//! # Search Error Types Module
//!
//! Failures of the search source and the search orchestrator. Missing
//! credentials and exhausted quotas are not errors here: the search source
//! degrades to an empty result list for those.

use thiserror::Error;

use crate::error::Error as CrateError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP transport failure talking to the search API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The search API answered with an error
    #[error("Search API error: {0}")]
    Api(String),

    /// The search API response could not be decoded
    #[error("Result processing error: {0}")]
    ResultProcessing(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::ResultProcessing(err.to_string())
    }
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Http(e) => CrateError::Http(e),
            other => CrateError::Search(other.to_string()),
        }
    }
}
