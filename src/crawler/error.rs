//! Error types for the crawler module

use thiserror::Error;

/// Failures inside a page fetch. These never escape `scrape`, which logs them
/// and reports the page as missing.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Unexpected status {0}")]
    Status(u16),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// URL without a host
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

impl From<CrawlError> for crate::error::Error {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => crate::error::Error::Http(e),
            other => crate::error::Error::Crawl(other.to_string()),
        }
    }
}
