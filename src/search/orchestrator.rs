//! Combines search-engine results with scraped page content

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::error::SearchError;
use super::serp_api::SearchSource;
use crate::crawler::{source_priority, PageScraper};

/// Substrings that put a result in the academic tier
const ACADEMIC_MARKERS: &[&str] = &[".edu", "wikipedia", "khanacademy"];

/// Length of the snippet synthesized from scraped content
const SNIPPET_CHARS: usize = 200;

/// A ranked search result, optionally enriched with scraped content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub source: String,
    pub content: Option<String>,
    pub priority: u32,
}

impl SearchResult {
    pub fn is_academic(&self) -> bool {
        let source = self.source.to_lowercase();
        ACADEMIC_MARKERS.iter().any(|marker| source.contains(marker))
    }

    fn content_len(&self) -> usize {
        self.content.as_deref().map_or(0, str::len)
    }
}

/// Limits for one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Organic results requested from the search source
    pub organic_results: usize,

    /// Leading links that get scraped
    pub scrape_count: usize,

    /// Cap on the returned results
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            organic_results: 10,
            scrape_count: 10,
            max_results: 20,
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }
}

/// Builder for SearchConfig
#[derive(Debug, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn organic_results(mut self, organic_results: usize) -> Self {
        self.config.organic_results = organic_results;
        self
    }

    pub fn scrape_count(mut self, scrape_count: usize) -> Self {
        self.config.scrape_count = scrape_count;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.config.max_results = max_results;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

/// Search, scrape the leading links, merge by URL and rank
pub struct SearchOrchestrator<S, P> {
    source: S,
    scraper: P,
    config: SearchConfig,
}

impl<S, P> SearchOrchestrator<S, P>
where
    S: SearchSource,
    P: PageScraper,
{
    pub fn new(source: S, scraper: P) -> Self {
        Self::with_config(source, scraper, SearchConfig::default())
    }

    pub fn with_config(source: S, scraper: P, config: SearchConfig) -> Self {
        Self {
            source,
            scraper,
            config,
        }
    }

    pub fn scraper(&self) -> &P {
        &self.scraper
    }

    /// Ranked results for `query`, academic sources first, at most
    /// `max_results` long
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidParameters(
                "query must not be empty".to_string(),
            ));
        }
        let started = Instant::now();

        let organic = match self.source.search(query, self.config.organic_results).await {
            Ok(organic) => organic,
            Err(err) => {
                warn!(error = %err, "Search source failed, continuing with no results");
                Vec::new()
            }
        };

        let links = organic
            .iter()
            .take(self.config.scrape_count)
            .map(|r| r.link.clone())
            .collect::<Vec<_>>();
        let scraped = self.scraper.scrape_multiple(&links).await;

        let mut merged: Vec<SearchResult> = Vec::with_capacity(organic.len());
        let mut by_link: HashMap<String, usize> = HashMap::new();

        for result in organic {
            if by_link.contains_key(&result.link) {
                continue;
            }
            by_link.insert(result.link.clone(), merged.len());
            merged.push(SearchResult {
                priority: source_priority(&result.source),
                title: result.title,
                link: result.link,
                snippet: result.snippet,
                source: result.source,
                content: None,
            });
        }

        for page in scraped {
            match by_link.get(&page.url) {
                Some(&index) => {
                    let entry = &mut merged[index];
                    entry.priority = entry.priority.min(page.priority);
                    entry.content = Some(page.content);
                }
                None => {
                    by_link.insert(page.url.clone(), merged.len());
                    merged.push(SearchResult {
                        snippet: page.content.chars().take(SNIPPET_CHARS).collect(),
                        title: page.title,
                        link: page.url,
                        source: page.source,
                        content: Some(page.content),
                        priority: page.priority,
                    });
                }
            }
        }

        // Stable: ties keep the search engine's order
        merged.sort_by(|a, b| {
            b.is_academic()
                .cmp(&a.is_academic())
                .then_with(|| b.content_len().cmp(&a.content_len()))
        });
        merged.truncate(self.config.max_results);

        info!(
            results = merged.len(),
            scraped = merged.iter().filter(|r| r.content.is_some()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(merged)
    }
}
