//! # Action Group Callbacks
//!
//! While it runs, the agent calls back into the crate through named action
//! groups (`StudySetGeneration`, `ContentSearch`, `DataStorage`). Each
//! callback arrives as an [`ActionGroupRequest`] and is answered with an
//! [`ActionGroupResponse`] whose JSON body is carried as a string. Handler
//! failures are answered with status 500 and an `ACTION_GROUP_ERROR` body
//! rather than an error value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::crawler::PageScraper;
use crate::generator::{build_flashcards, build_quiz, GenerationError};
use crate::sanitizer::{sanitize, validate};
use crate::search::{SearchError, SearchOrchestrator, SearchSource};
use crate::store::{DatabaseAdapter, StoreError, StudySetRepository};
use crate::types::{GeneratedMaterials, RawFlashcard, RawQuiz};

const JSON_CONTENT_TYPE: &str = "application/json";
const SNIPPET_FALLBACK_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupRequest {
    pub action_group_invocation_input: ActionGroupInvocation,
    pub session_id: String,
    pub message_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupInvocation {
    pub action_group_name: String,
    pub verb: String,
    pub api_path: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content: BTreeMap<String, BodyContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyContent {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupResponse {
    pub message_version: String,
    pub response: ActionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: BTreeMap<String, BodyContent>,
}

impl ActionGroupResponse {
    /// The decoded JSON body, if any
    pub fn body(&self) -> Option<Value> {
        self.response
            .response_body
            .get(JSON_CONTENT_TYPE)
            .and_then(|content| serde_json::from_str(&content.body).ok())
    }
}

/// Why a callback could not be served
#[derive(Debug, Error)]
pub enum ActionGroupError {
    #[error("Unknown action group: {0}")]
    UnknownGroup(String),

    #[error("Unsupported endpoint: {verb} {path}")]
    UnsupportedEndpoint { verb: String, path: String },

    #[error("{0}")]
    MissingInput(&'static str),

    #[error("Summary validation failed")]
    SummaryValidation,

    #[error("Study set not found: {0}")]
    NotFound(String),

    #[error("Invalid study set content: {0}")]
    Content(#[from] GenerationError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parameters and decoded body of one callback
struct CallInput {
    params: BTreeMap<String, Value>,
    body: Option<Value>,
}

impl CallInput {
    fn from_invocation(invocation: &ActionGroupInvocation) -> Self {
        let params = invocation
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        let body = invocation.request_body.as_ref().and_then(|request_body| {
            let content = request_body
                .content
                .get(JSON_CONTENT_TYPE)
                .or_else(|| request_body.content.values().next())?;
            if content.body.is_empty() {
                return None;
            }
            Some(
                serde_json::from_str(&content.body)
                    .unwrap_or_else(|_| Value::String(content.body.clone())),
            )
        });
        Self { params, body }
    }

    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).and_then(non_empty_text)
    }

    fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref()?.get(name).filter(|v| !v.is_null())
    }

    fn body_text(&self, name: &str) -> Option<String> {
        self.body_field(name).and_then(non_empty_text)
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Serves agent callbacks from the search orchestrator and the study-set store
pub struct ActionGroupHandler<S, P, D> {
    search: SearchOrchestrator<S, P>,
    repository: StudySetRepository<D>,
}

impl<S, P, D> ActionGroupHandler<S, P, D>
where
    S: SearchSource,
    P: PageScraper,
    D: DatabaseAdapter,
{
    pub fn new(search: SearchOrchestrator<S, P>, repository: StudySetRepository<D>) -> Self {
        Self { search, repository }
    }

    /// Answer one callback on behalf of `user_id`
    #[instrument(skip(self, request), fields(
        action_group = %request.action_group_invocation_input.action_group_name,
        verb = %request.action_group_invocation_input.verb,
        api_path = %request.action_group_invocation_input.api_path,
        session_id = %request.session_id,
    ))]
    pub async fn handle(&self, request: &ActionGroupRequest, user_id: &str) -> ActionGroupResponse {
        let invocation = &request.action_group_invocation_input;
        info!(user_id, "Action group invocation");

        let (status, body) = match self.dispatch(invocation, user_id).await {
            Ok(body) => (200, body),
            Err(err) => {
                error!(error = %err, "Action group handler error");
                (
                    500,
                    json!({"error": {"code": "ACTION_GROUP_ERROR", "message": err.to_string()}}),
                )
            }
        };

        let mut response_body = BTreeMap::new();
        response_body.insert(
            JSON_CONTENT_TYPE.to_string(),
            BodyContent {
                body: body.to_string(),
            },
        );
        ActionGroupResponse {
            message_version: request.message_version.clone(),
            response: ActionResponse {
                action_group: invocation.action_group_name.clone(),
                api_path: invocation.api_path.clone(),
                http_method: invocation.verb.clone(),
                http_status_code: status,
                response_body,
            },
        }
    }

    async fn dispatch(
        &self,
        invocation: &ActionGroupInvocation,
        user_id: &str,
    ) -> Result<Value, ActionGroupError> {
        let input = CallInput::from_invocation(invocation);
        let verb = invocation.verb.to_uppercase();
        let path = invocation.api_path.as_str();
        let unsupported = || ActionGroupError::UnsupportedEndpoint {
            verb: invocation.verb.clone(),
            path: path.to_string(),
        };

        match invocation.action_group_name.as_str() {
            "StudySetGeneration" if verb == "POST" && path.contains("/generate/studyset") => {
                let topic = input
                    .body_text("topic")
                    .or_else(|| input.param("topic"))
                    .ok_or(ActionGroupError::MissingInput("Topic is required"))?;
                Ok(json!({
                    "success": true,
                    "message": "Study set generation initiated",
                    "topic": topic,
                }))
            }
            "ContentSearch" if verb == "GET" && path.contains("/search") => {
                let query = input
                    .param("query")
                    .or_else(|| input.body_text("query"))
                    .ok_or(ActionGroupError::MissingInput("Search query is required"))?;
                self.content_search(&query).await
            }
            "DataStorage" if verb == "POST" && path.contains("/study-sets") => {
                self.store_study_set(&input, user_id).await
            }
            "DataStorage" if verb == "GET" && path.contains("/study-sets") => {
                let id = input
                    .param("id")
                    .ok_or(ActionGroupError::MissingInput("Study set ID is required"))?;
                let study_set = self
                    .repository
                    .get_study_set(&id)
                    .await?
                    .ok_or(ActionGroupError::NotFound(id.clone()))?;
                Ok(json!({ "success": true, "studySetId": id, "studySet": study_set }))
            }
            "StudySetGeneration" | "ContentSearch" | "DataStorage" => Err(unsupported()),
            other => Err(ActionGroupError::UnknownGroup(other.to_string())),
        }
    }

    async fn content_search(&self, query: &str) -> Result<Value, ActionGroupError> {
        let results = self.search.search(query).await?;
        let results = results
            .iter()
            .map(|r| {
                let snippet = if r.snippet.trim().is_empty() {
                    r.content
                        .as_deref()
                        .unwrap_or_default()
                        .chars()
                        .take(SNIPPET_FALLBACK_CHARS)
                        .collect()
                } else {
                    r.snippet.clone()
                };
                json!({ "title": r.title, "url": r.link, "snippet": snippet })
            })
            .collect::<Vec<_>>();
        Ok(json!({ "success": true, "results": results }))
    }

    async fn store_study_set(
        &self,
        input: &CallInput,
        user_id: &str,
    ) -> Result<Value, ActionGroupError> {
        let missing = ActionGroupError::MissingInput(
            "Missing required fields: topic, summary, flashcards, quiz",
        );
        let (Some(topic), Some(summary), Some(flashcards), Some(quiz)) = (
            input.body_text("topic"),
            input.body_text("summary"),
            input.body_field("flashcards"),
            input.body_field("quiz"),
        ) else {
            return Err(missing);
        };

        let summary = sanitize(&summary);
        if summary.is_empty() || !validate(&summary) {
            return Err(ActionGroupError::SummaryValidation);
        }
        let topic = sanitize(&topic);

        let raw_cards: Vec<RawFlashcard> = serde_json::from_value(flashcards.clone())
            .map_err(|e| GenerationError::InvalidInput(format!("flashcards: {e}")))?;
        let raw_quiz: RawQuiz = match quiz {
            Value::Array(_) => RawQuiz {
                questions: serde_json::from_value(quiz.clone())
                    .map_err(|e| GenerationError::InvalidInput(format!("quiz: {e}")))?,
            },
            other => serde_json::from_value(other.clone())
                .map_err(|e| GenerationError::InvalidInput(format!("quiz: {e}")))?,
        };
        let card_count = raw_cards.len();
        let question_count = raw_quiz.questions.len();
        let materials = GeneratedMaterials {
            summary,
            flashcards: build_flashcards(raw_cards, card_count)?,
            quiz: build_quiz(raw_quiz.questions, question_count)?,
        };

        let study_set_id = self
            .repository
            .create_study_set(user_id, &topic, &materials)
            .await?;
        let topic_id = self
            .repository
            .create_topic(user_id, &topic, Some(&study_set_id))
            .await?;

        Ok(json!({ "success": true, "studySetId": study_set_id, "topicId": topic_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::ScrapedContent;
    use crate::search::OrganicResult;
    use crate::store::LibsqlStore;
    use tempfile::tempdir;

    struct StaticSource(Vec<OrganicResult>);

    impl SearchSource for StaticSource {
        async fn search(
            &self,
            _query: &str,
            limit: usize,
        ) -> Result<Vec<OrganicResult>, SearchError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct StaticScraper(Vec<ScrapedContent>);

    impl PageScraper for StaticScraper {
        async fn scrape(&self, url: &str) -> Option<ScrapedContent> {
            self.0.iter().find(|p| p.url == url).cloned()
        }

        async fn scrape_multiple(&self, urls: &[String]) -> Vec<ScrapedContent> {
            urls.iter()
                .filter_map(|url| self.0.iter().find(|p| &p.url == url).cloned())
                .collect()
        }
    }

    type Handler = ActionGroupHandler<StaticSource, StaticScraper, LibsqlStore>;

    async fn handler() -> (Handler, tempfile::TempDir) {
        let source = StaticSource(vec![
            OrganicResult {
                title: "Photosynthesis - Wikipedia".into(),
                link: "https://en.wikipedia.org/wiki/Photosynthesis".into(),
                snippet: "Photosynthesis is a process used by plants.".into(),
                source: "en.wikipedia.org".into(),
            },
            OrganicResult {
                title: "Plant blog".into(),
                link: "https://plants.example.com/light".into(),
                snippet: String::new(),
                source: "plants.example.com".into(),
            },
        ]);
        let scraper = StaticScraper(vec![ScrapedContent {
            url: "https://plants.example.com/light".into(),
            title: "Plant blog".into(),
            content: "Light ".repeat(100),
            source: "plants.example.com".into(),
            priority: 10,
        }]);
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("agent.db").to_string_lossy().to_string();
        let store = LibsqlStore::open(&path).await.unwrap();
        let handler = ActionGroupHandler::new(
            SearchOrchestrator::new(source, scraper),
            StudySetRepository::new(store),
        );
        (handler, temp_dir)
    }

    fn request(group: &str, verb: &str, path: &str, params: Value, body: Option<Value>) -> ActionGroupRequest {
        let mut invocation = json!({
            "actionGroupName": group,
            "verb": verb,
            "apiPath": path,
            "parameters": params,
        });
        if let Some(body) = body {
            invocation["requestBody"] =
                json!({"content": {"application/json": {"body": body.to_string()}}});
        }
        serde_json::from_value(json!({
            "actionGroupInvocationInput": invocation,
            "sessionId": "quizthebest-1-abc",
            "messageVersion": "1.0",
        }))
        .unwrap()
    }

    fn error_message(response: &ActionGroupResponse) -> String {
        assert_eq!(response.response.http_status_code, 500);
        let body = response.body().unwrap();
        assert_eq!(body["error"]["code"], "ACTION_GROUP_ERROR");
        body["error"]["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_content_search() {
        let (handler, _dir) = handler().await;
        let req = request(
            "ContentSearch",
            "GET",
            "/search",
            json!([{"name": "query", "type": "string", "value": "photosynthesis"}]),
            None,
        );
        let response = handler.handle(&req, "alice").await;

        assert_eq!(response.response.http_status_code, 200);
        assert_eq!(response.message_version, "1.0");
        assert_eq!(response.response.http_method, "GET");
        let body = response.body().unwrap();
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["url"], "https://en.wikipedia.org/wiki/Photosynthesis");
        // Empty snippet falls back to the start of the scraped content
        assert_eq!(results[1]["snippet"].as_str().unwrap().chars().count(), 200);
    }

    #[tokio::test]
    async fn test_missing_query() {
        let (handler, _dir) = handler().await;
        let req = request("ContentSearch", "GET", "/search", json!([]), None);
        let response = handler.handle(&req, "alice").await;
        assert_eq!(error_message(&response), "Search query is required");
    }

    #[tokio::test]
    async fn test_store_and_fetch_study_set() {
        let (handler, _dir) = handler().await;
        let body = json!({
            "topic": "Photosynthesis",
            "summary": "Plants <b>convert</b> light into chemical energy.",
            "flashcards": [{"question": "What do plants convert?", "answer": "Light into chemical energy."}],
            "quiz": {"questions": [
                {"type": "true-false", "question": "Plants convert light energy.", "correctAnswer": "true"}
            ]}
        });
        let req = request("DataStorage", "POST", "/study-sets", json!([]), Some(body));
        let response = handler.handle(&req, "alice").await;
        assert_eq!(response.response.http_status_code, 200);
        let body = response.body().unwrap();
        let id = body["studySetId"].as_str().unwrap().to_string();
        assert!(body["topicId"].is_string());

        let req = request(
            "DataStorage",
            "GET",
            "/study-sets/{id}",
            json!([{"name": "id", "type": "string", "value": id}]),
            None,
        );
        let response = handler.handle(&req, "alice").await;
        let body = response.body().unwrap();
        assert_eq!(body["studySet"]["summary"], "Plants convert light into chemical energy.");
        assert_eq!(body["studySet"]["userId"], "alice");
        assert_eq!(body["studySet"]["quiz"]["questions"][0]["correctAnswer"], true);

        let topics = handler.repository.topics_for_user("alice").await.unwrap();
        assert_eq!(topics[0].study_set_id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_store_requires_every_field() {
        let (handler, _dir) = handler().await;
        let body = json!({"topic": "Photosynthesis", "summary": "Plants make sugar."});
        let req = request("DataStorage", "POST", "/study-sets", json!([]), Some(body));
        let response = handler.handle(&req, "alice").await;
        assert_eq!(
            error_message(&response),
            "Missing required fields: topic, summary, flashcards, quiz"
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_study_set() {
        let (handler, _dir) = handler().await;
        let req = request(
            "DataStorage",
            "GET",
            "/study-sets",
            json!([{"name": "id", "type": "string", "value": "nope"}]),
            None,
        );
        let response = handler.handle(&req, "alice").await;
        assert!(error_message(&response).contains("nope"));
    }

    #[tokio::test]
    async fn test_generation_acknowledged() {
        let (handler, _dir) = handler().await;
        let req = request(
            "StudySetGeneration",
            "POST",
            "/generate/studyset",
            json!([{"name": "topic", "type": "string", "value": "Mitosis"}]),
            None,
        );
        let body = handler.handle(&req, "alice").await.body().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["topic"], "Mitosis");
    }

    #[tokio::test]
    async fn test_unknown_group_and_endpoint() {
        let (handler, _dir) = handler().await;
        let req = request("Weather", "GET", "/forecast", json!([]), None);
        let response = handler.handle(&req, "alice").await;
        assert_eq!(error_message(&response), "Unknown action group: Weather");
        assert_eq!(response.response.action_group, "Weather");

        let req = request("ContentSearch", "POST", "/index", json!([]), None);
        let response = handler.handle(&req, "alice").await;
        assert_eq!(error_message(&response), "Unsupported endpoint: POST /index");
    }
}
