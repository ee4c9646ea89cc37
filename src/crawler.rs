//! # Page Scraper
//!
//! Turns a URL into readable, sanitized text for the generation pipeline.
//!
//! ## Key Components
//!
//! - `Scraper`: fetches pages over HTTP and extracts their text
//! - `PageScraper`: the trait the search orchestrator consumes
//! - `DomainRateLimiter`: per-domain admission table, injectable and inspectable
//! - `ScraperConfig`: fetch timeout, pacing and content bounds
//!
//! ## Behaviour
//!
//! - Requests to a domain are refused (not queued) when the domain has used
//!   its window budget or was hit too recently
//! - PDFs and non-HTML responses are skipped
//! - Navigation, headers, footers, asides, scripts and styles are dropped and a
//!   main/article/content container is preferred over the whole body
//! - Text is clamped to a maximum length and discarded below a minimum
//! - Batches are scraped sequentially with a fixed delay and sorted by
//!   source priority (academic sources first)

mod config;
mod content_extraction;
mod error;
mod priority;
mod rate_limit;
mod scraper_impl;

pub use config::{ScraperConfig, ScraperConfigBuilder};
pub use content_extraction::{extract_page, ExtractedPage};
pub use error::CrawlError;
pub use priority::{is_academic_source, source_priority, ACADEMIC_SOURCES, DEFAULT_PRIORITY};
pub use rate_limit::{DomainRateLimiter, DomainWindow};
pub use scraper_impl::{PageScraper, Scraper};

use serde::{Deserialize, Serialize};

/// Readable content scraped from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedContent {
    /// URL of the page
    pub url: String,

    /// Page title, "Untitled" when the page has none
    pub title: String,

    /// Sanitized text, bounded in length
    pub content: String,

    /// Host name of the page
    pub source: String,

    /// Source priority, lower is more academic
    pub priority: u32,
}
