//! # Scraper Configuration Module
//!
//! Politeness and extraction limits for the page scraper, built with a
//! builder over polite defaults.

use std::time::Duration;

/// Configuration for the scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// User agent to use for requests
    pub user_agent: String,

    /// Timeout for a single page fetch
    pub fetch_timeout: Duration,

    /// Minimum spacing between two requests to the same domain
    pub min_interval: Duration,

    /// Requests allowed per domain within one window
    pub max_requests_per_window: u32,

    /// Length of the per-domain counting window
    pub window: Duration,

    /// Fixed pause after each URL in a batch
    pub inter_request_delay: Duration,

    /// Extracted text is cut to this many characters
    pub max_content_chars: usize,

    /// Pages with less text than this are discarded
    pub min_content_chars: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; QuizTheBest/1.0)".to_string(),
            fetch_timeout: Duration::from_secs(10),
            min_interval: Duration::from_secs(2),
            max_requests_per_window: 5,
            window: Duration::from_secs(60),
            inter_request_delay: Duration::from_millis(500),
            max_content_chars: 5_000,
            min_content_chars: 100,
        }
    }
}

/// Builder for ScraperConfig
#[derive(Debug, Default)]
pub struct ScraperConfigBuilder {
    config: ScraperConfig,
}

impl ScraperConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
        }
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the page fetch timeout
    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.config.fetch_timeout = fetch_timeout;
        self
    }

    /// Set the minimum spacing between requests to one domain
    pub fn min_interval(mut self, min_interval: Duration) -> Self {
        self.config.min_interval = min_interval;
        self
    }

    /// Set the per-domain request budget and its window
    pub fn domain_budget(mut self, max_requests: u32, window: Duration) -> Self {
        self.config.max_requests_per_window = max_requests;
        self.config.window = window;
        self
    }

    /// Set the pause between URLs in a batch
    pub fn inter_request_delay(mut self, delay: Duration) -> Self {
        self.config.inter_request_delay = delay;
        self
    }

    /// Set the extracted text bounds
    pub fn content_bounds(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.config.min_content_chars = min_chars;
        self.config.max_content_chars = max_chars;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScraperConfig {
        self.config
    }
}

impl ScraperConfig {
    /// Create a new builder
    pub fn builder() -> ScraperConfigBuilder {
        ScraperConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScraperConfig::default();

        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.min_interval, Duration::from_secs(2));
        assert_eq!(config.max_requests_per_window, 5);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.max_content_chars, 5_000);
        assert_eq!(config.min_content_chars, 100);
        assert!(config.user_agent.contains("QuizTheBest"));
    }

    #[test]
    fn test_builder() {
        let config = ScraperConfig::builder()
            .user_agent("test-agent")
            .min_interval(Duration::ZERO)
            .domain_budget(10, Duration::from_secs(1))
            .inter_request_delay(Duration::from_millis(5))
            .content_bounds(10, 200)
            .build();

        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.min_interval, Duration::ZERO);
        assert_eq!(config.max_requests_per_window, 10);
        assert_eq!(config.inter_request_delay, Duration::from_millis(5));
        assert_eq!(config.min_content_chars, 10);
        assert_eq!(config.max_content_chars, 200);
    }
}
