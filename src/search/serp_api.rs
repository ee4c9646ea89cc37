//! Web search through SerpAPI's Google engine

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// One organic web result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Host name of the link
    pub source: String,
}

/// Query an external search engine for a topic
pub trait SearchSource: Send + Sync {
    /// Up to `limit` ranked results. A source that cannot answer should
    /// yield an empty list; callers also treat an `Err` as no results.
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<OrganicResult>, SearchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<SerpOrganic>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// SerpAPI client
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another host, e.g. a local mock server
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn is_quota_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("quota") || lowered.contains("limit")
}

fn host_of(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

impl SerpApiClient {
    async fn fetch(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<OrganicResult>, SearchError> {
        let num = limit.to_string();
        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", api_key),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 429 {
            warn!(%status, "Search API quota exceeded, returning no search results");
            return Ok(Vec::new());
        }

        let parsed: Option<SerpResponse> = serde_json::from_str(&body).ok();
        let api_error = parsed.as_ref().and_then(|p| p.error.clone());

        if let Some(message) = api_error.or_else(|| {
            (!status.is_success()).then(|| format!("HTTP {}: {}", status.as_u16(), body))
        }) {
            if is_quota_message(&message) {
                warn!(error = %message, "Search API quota exceeded, returning no search results");
                return Ok(Vec::new());
            }
            return Err(SearchError::Api(message));
        }

        let parsed = match parsed {
            Some(parsed) => parsed,
            None => serde_json::from_str::<SerpResponse>(&body)?,
        };

        let results = parsed
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(limit)
            .map(|r| OrganicResult {
                source: host_of(&r.link),
                title: r.title,
                link: r.link,
                snippet: r.snippet,
            })
            .collect::<Vec<_>>();

        debug!(count = results.len(), "Search API returned results");
        Ok(results)
    }
}

impl SearchSource for SerpApiClient {
    /// Never fails: a missing key, an exhausted quota, a transport error or
    /// an API error all yield no results.
    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<OrganicResult>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("SERPAPI_KEY not configured, returning no search results");
            return Ok(Vec::new());
        };

        match self.fetch(api_key, query, limit).await {
            Ok(results) => Ok(results),
            Err(err) => {
                error!(error = %err, "Search API request failed, returning no search results");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_search_parses_organic_results() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("engine".into(), "google".into()),
                Matcher::UrlEncoded("q".into(), "photosynthesis".into()),
                Matcher::UrlEncoded("api_key".into(), "test-key".into()),
                Matcher::UrlEncoded("num".into(), "10".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"organic_results": [
                    {"title": "Photosynthesis - Wikipedia", "link": "https://en.wikipedia.org/wiki/Photosynthesis", "snippet": "Photosynthesis is..."},
                    {"title": "No link"},
                    {"title": "Khan", "link": "https://www.khanacademy.org/science/photosynthesis", "snippet": "Learn"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("test-key".to_string()));
        client.set_base_url(server.url());

        let results = client.search("photosynthesis", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "en.wikipedia.org");
        assert_eq!(results[1].source, "www.khanacademy.org");
        assert_eq!(results[1].snippet, "Learn");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_returns_empty_without_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut client = SerpApiClient::new(None);
        client.set_base_url(server.url());

        assert!(client.search("anything", 10).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_quota_error_degrades_to_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "Your account has run out of searches (monthly limit)."}"#)
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("k".to_string()));
        client.set_base_url(server.url());

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_requests_degrades_to_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("k".to_string()));
        client.set_base_url(server.url());

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_errors_degrade_to_empty() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": "Invalid API key."}"#)
            .expect(1)
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("bad".to_string()));
        client.set_base_url(server.url());

        assert!(client.search("q", 10).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("k".to_string()));
        client.set_base_url(server.url());

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_degrades_to_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let mut client = SerpApiClient::new(Some("k".to_string()));
        client.set_base_url(server.url());

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades_to_empty() {
        let mut client = SerpApiClient::new(Some("k".to_string()));
        client.set_base_url("http://127.0.0.1:1");

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }
}
