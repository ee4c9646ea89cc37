//! # Topic Search
//!
//! Gathers source material for a topic: organic results from a web search
//! engine, enriched with the readable text of the leading pages.
//!
//! ## Key Components
//!
//! - `SearchSource`: the search-engine seam, implemented by `SerpApiClient`
//! - `SearchOrchestrator`: searches, scrapes the first links, merges by URL
//!   and ranks academic sources first, then longer content first
//! - `SearchResult`: one ranked result with optional scraped content
//!
//! A missing API key or an exhausted quota degrades to an empty result list.
//! Only unexpected failures surface as a `SearchError`.

mod error;
mod orchestrator;
mod serp_api;

pub use error::SearchError;
pub use orchestrator::{SearchConfig, SearchConfigBuilder, SearchOrchestrator, SearchResult};
pub use serp_api::{OrganicResult, SearchSource, SerpApiClient};
