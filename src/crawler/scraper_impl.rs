use std::future::Future;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::content_extraction::extract_page;
use super::error::CrawlError;
use super::priority::source_priority;
use super::rate_limit::DomainRateLimiter;
use super::{ScrapedContent, ScraperConfig};

/// Fetch pages and turn them into ranked readable content
pub trait PageScraper: Send + Sync {
    /// Scrape one page. Every failure is reported as `None`.
    fn scrape(&self, url: &str) -> impl Future<Output = Option<ScrapedContent>> + Send;

    /// Scrape pages one after another, most academic first
    fn scrape_multiple(&self, urls: &[String])
    -> impl Future<Output = Vec<ScrapedContent>> + Send;
}

/// HTTP page scraper with per-domain pacing
#[derive(Debug, Clone)]
pub struct Scraper {
    client: reqwest::Client,
    config: ScraperConfig,
    limiter: Arc<DomainRateLimiter>,
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Result<Self, CrawlError> {
        let limiter = Arc::new(DomainRateLimiter::from_config(&config));
        Self::with_limiter(config, limiter)
    }

    /// Share a rate-limiter table between scrapers
    pub fn with_limiter(
        config: ScraperConfig,
        limiter: Arc<DomainRateLimiter>,
    ) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<DomainRateLimiter> {
        &self.limiter
    }

    async fn fetch(&self, url: &str, domain: &str) -> Result<Option<ScrapedContent>, CrawlError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if !is_html {
            debug!(url, "Skipping non-HTML response");
            return Ok(None);
        }

        let html = response.text().await?;
        let page = extract_page(&html, self.config.max_content_chars)?;

        if page.text.chars().count() < self.config.min_content_chars {
            debug!(url, length = page.text.len(), "Discarding page with too little content");
            return Ok(None);
        }

        Ok(Some(ScrapedContent {
            url: url.to_string(),
            title: page.title,
            content: page.text,
            source: domain.to_string(),
            priority: source_priority(domain),
        }))
    }
}

fn is_pdf(url: &str) -> bool {
    let lowered = url.to_lowercase();
    lowered.ends_with(".pdf") || lowered.contains(".pdf?")
}

impl PageScraper for Scraper {
    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Option<ScrapedContent> {
        let domain = match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.to_string(),
                None => {
                    warn!(error = %CrawlError::MissingHost(url.to_string()), "Skipping URL");
                    return None;
                }
            },
            Err(e) => {
                warn!(error = %CrawlError::UrlParse(e), url, "Skipping URL");
                return None;
            }
        };

        if !self.limiter.check(&domain) {
            warn!(domain, "Rate limit exceeded for domain");
            return None;
        }

        if is_pdf(url) {
            debug!(url, "Skipping PDF");
            return None;
        }

        match self.fetch(url, &domain).await {
            Ok(content) => content,
            Err(CrawlError::Http(e)) if e.is_timeout() => {
                warn!(url, "Page fetch timed out");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to scrape page");
                None
            }
        }
    }

    #[instrument(skip(self, urls), fields(count = urls.len()))]
    async fn scrape_multiple(&self, urls: &[String]) -> Vec<ScrapedContent> {
        let mut results = Vec::new();
        for url in urls {
            if let Some(content) = self.scrape(url).await {
                results.push(content);
            }
            tokio::time::sleep(self.config.inter_request_delay).await;
        }
        results.sort_by_key(|content| content.priority);
        info!(requested = urls.len(), scraped = results.len(), "Scraped pages");
        results
    }
}
