//! # Generation Pipeline
//!
//! Turns a topic into a summary, flashcards and a quiz:
//! search → join content → sanitize/validate → summarize → flashcards → quiz.
//!
//! The overall deadline is checked before each model stage. A stage already
//! running is never interrupted; only the next one is skipped.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::{AppConfig, DEFAULT_TIMEOUT_SECS};
use crate::crawler::PageScraper;
use crate::generator::{
    generate_flashcards, generate_quiz, generate_summary, generate_synoptic_summary,
    GenerationError, CONTENT_SEPARATOR,
};
use crate::model::TextModel;
use crate::quality::assess_quality;
use crate::sanitizer;
use crate::search::{SearchOrchestrator, SearchResult, SearchSource};
use crate::types::{GeneratedMaterials, Quiz};

/// Options for one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub timeout: Duration,
    pub flashcard_count: usize,
    pub quiz_count: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            flashcard_count: 10,
            quiz_count: 5,
        }
    }
}

impl GenerationOptions {
    pub fn builder() -> GenerationOptionsBuilder {
        GenerationOptionsBuilder::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::builder().timeout(config.generation_timeout).build()
    }
}

/// Builder for GenerationOptions
#[derive(Debug, Default)]
pub struct GenerationOptionsBuilder {
    options: GenerationOptions,
}

impl GenerationOptionsBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn flashcard_count(mut self, count: usize) -> Self {
        self.options.flashcard_count = count;
        self
    }

    pub fn quiz_count(mut self, count: usize) -> Self {
        self.options.quiz_count = count;
        self
    }

    pub fn build(self) -> GenerationOptions {
        self.options
    }
}

/// Advisory deadline for a run
struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    fn check(&self, next_stage: &str) -> Result<(), GenerationError> {
        if self.started.elapsed() > self.timeout {
            info!(next_stage, elapsed_ms = self.elapsed_ms(), "Generation deadline passed");
            return Err(GenerationError::Timeout);
        }
        Ok(())
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Join the non-empty content (or snippet) of each result
pub fn join_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.content.as_deref().unwrap_or(&r.snippet).trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(CONTENT_SEPARATOR)
}

/// Sequential generation over a search orchestrator and a model
pub struct GenerationOrchestrator<M, S, P> {
    model: M,
    search: SearchOrchestrator<S, P>,
}

impl<M, S, P> GenerationOrchestrator<M, S, P>
where
    M: TextModel,
    S: SearchSource,
    P: PageScraper,
{
    pub fn new(model: M, search: SearchOrchestrator<S, P>) -> Self {
        Self { model, search }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn search(&self) -> &SearchOrchestrator<S, P> {
        &self.search
    }

    /// Search for `topic` and return the joined, sanitized material
    #[instrument(skip(self))]
    pub async fn gather_content(&self, topic: &str) -> Result<String, GenerationError> {
        let results = self.search.search(topic).await?;
        if results.is_empty() {
            return Err(GenerationError::NoContent);
        }

        let content = sanitizer::sanitize(&join_results(&results));
        if content.is_empty() {
            return Err(GenerationError::NoContent);
        }
        if !sanitizer::validate(&content) {
            return Err(GenerationError::ContentValidation);
        }

        let quality = assess_quality(&content);
        debug!(
            results = results.len(),
            content_len = content.len(),
            quality = quality.score,
            issues = ?quality.issues,
            "Gathered content"
        );
        Ok(content)
    }

    /// Run the whole pipeline for `topic`
    #[instrument(skip(self, options), fields(timeout_secs = options.timeout.as_secs()))]
    pub async fn generate(
        &self,
        topic: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedMaterials, GenerationError> {
        let topic = clean_topic(topic)?;
        let deadline = Deadline::start(options.timeout);
        info!(topic, "Starting generation");

        let content = self.gather_content(&topic).await?;
        info!(elapsed_ms = deadline.elapsed_ms(), "Search stage finished");

        deadline.check("summary")?;
        let summary = generate_summary(&self.model, &topic, &content).await?;
        info!(elapsed_ms = deadline.elapsed_ms(), "Summary stage finished");

        deadline.check("flashcards")?;
        let flashcards =
            generate_flashcards(&self.model, &summary, &topic, options.flashcard_count).await?;
        info!(
            elapsed_ms = deadline.elapsed_ms(),
            count = flashcards.len(),
            "Flashcard stage finished"
        );

        deadline.check("quiz")?;
        let quiz = generate_quiz(&self.model, &summary, &topic, options.quiz_count).await?;
        info!(
            elapsed_ms = deadline.elapsed_ms(),
            questions = quiz.questions.len(),
            "Quiz stage finished"
        );

        Ok(GeneratedMaterials {
            summary,
            flashcards,
            quiz,
        })
    }

    /// A fresh quiz over an existing summary
    pub async fn regenerate_quiz(
        &self,
        topic: &str,
        summary: &str,
        count: usize,
    ) -> Result<Quiz, GenerationError> {
        generate_quiz(&self.model, summary, topic, count).await
    }

    /// One summary connecting several topics, each searched in turn
    #[instrument(skip(self))]
    pub async fn synoptic(&self, topics: &[String]) -> Result<String, GenerationError> {
        let mut cleaned = Vec::with_capacity(topics.len());
        let mut contents = Vec::with_capacity(topics.len());
        for topic in topics {
            let topic = clean_topic(topic)?;
            contents.push(self.gather_content(&topic).await?);
            cleaned.push(topic);
        }
        generate_synoptic_summary(&self.model, &cleaned, &contents).await
    }
}

fn clean_topic(topic: &str) -> Result<String, GenerationError> {
    let topic = sanitizer::sanitize(topic);
    if topic.is_empty() {
        return Err(GenerationError::InvalidInput(
            "topic must not be empty".to_string(),
        ));
    }
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::crawler::ScrapedContent;
    use crate::model::mock_model::MockTextModel;
    use crate::model::{InvokeOptions, ModelError};
    use crate::search::{OrganicResult, SearchError};

    struct StaticSource(Vec<OrganicResult>);

    impl SearchSource for StaticSource {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<OrganicResult>, SearchError> {
            Ok(self.0.clone())
        }
    }

    struct StaticScraper(Vec<ScrapedContent>);

    impl PageScraper for StaticScraper {
        async fn scrape(&self, url: &str) -> Option<ScrapedContent> {
            self.0.iter().find(|p| p.url == url).cloned()
        }

        async fn scrape_multiple(&self, urls: &[String]) -> Vec<ScrapedContent> {
            self.0
                .iter()
                .filter(|p| urls.contains(&p.url))
                .cloned()
                .collect()
        }
    }

    fn photosynthesis_search() -> SearchOrchestrator<StaticSource, StaticScraper> {
        let link = "https://en.wikipedia.org/wiki/Photosynthesis".to_string();
        SearchOrchestrator::new(
            StaticSource(vec![OrganicResult {
                title: "Photosynthesis".to_string(),
                link: link.clone(),
                snippet: "Photosynthesis is a process.".to_string(),
                source: "en.wikipedia.org".to_string(),
            }]),
            StaticScraper(vec![ScrapedContent {
                url: link,
                title: "Photosynthesis".to_string(),
                content: "Photosynthesis is the process by which plants use sunlight, water \
                          and carbon dioxide to create oxygen and energy in the form of sugar."
                    .to_string(),
                source: "en.wikipedia.org".to_string(),
                priority: 1,
            }]),
        )
    }

    fn empty_search() -> SearchOrchestrator<StaticSource, StaticScraper> {
        SearchOrchestrator::new(StaticSource(vec![]), StaticScraper(vec![]))
    }

    fn flashcards_response(n: usize) -> String {
        serde_json::to_string(
            &(0..n)
                .map(|i| json!({"question": format!("Photosynthesis question {i}?"), "answer": format!("Photosynthesis answer {i}.")}))
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn quiz_response(n: usize) -> String {
        serde_json::to_string(
            &(0..n)
                .map(|i| json!({"type": "multiple-choice", "question": format!("Photosynthesis question {i}?"), "options": ["a", "b", "c", "d"], "correctAnswer": i % 4}))
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let model = MockTextModel::with_responses([
            "Photosynthesis converts light energy into chemical energy.".to_string(),
            flashcards_response(12),
            quiz_response(6),
        ]);
        let orchestrator = GenerationOrchestrator::new(model, photosynthesis_search());

        let materials = orchestrator
            .generate("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        assert!(!materials.summary.is_empty());
        assert_eq!(materials.flashcards.len(), 10);
        assert_eq!(materials.quiz.questions.len(), 5);

        let prompts = orchestrator.model().prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("sunlight, water and carbon dioxide"));
        assert!(prompts[1].contains("Photosynthesis converts light energy"));
        assert!(prompts[2].contains("Photosynthesis converts light energy"));
    }

    #[tokio::test]
    async fn test_no_results_fails_without_calling_model() {
        let orchestrator = GenerationOrchestrator::new(MockTextModel::new(), empty_search());

        let err = orchestrator
            .generate("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::NoContent));
        assert_eq!(orchestrator.model().call_count(), 0);
    }

    #[tokio::test]
    async fn test_stage_failures_propagate() {
        let model = MockTextModel::new();
        model.push_response("A perfectly fine summary of photosynthesis.");
        model.push_error(ModelError::AccessDenied("403".to_string()));
        let orchestrator = GenerationOrchestrator::new(model, photosynthesis_search());

        let err = orchestrator
            .generate("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Model(ModelError::AccessDenied(_))));
        assert_eq!(orchestrator.model().call_count(), 2);
    }

    /// Takes a fixed amount of (paused) time per call
    struct SlowModel {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl TextModel for SlowModel {
        async fn invoke(&self, _prompt: &str, _options: InvokeOptions) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok("A slow but valid summary of the topic.".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_skips_next_stage() {
        let model = SlowModel {
            delay: Duration::from_secs(20),
            calls: AtomicUsize::new(0),
        };
        let orchestrator = GenerationOrchestrator::new(model, photosynthesis_search());
        let options = GenerationOptions::builder()
            .timeout(Duration::from_secs(10))
            .build();

        let err = orchestrator
            .generate("Photosynthesis", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout));
        // The summary call ran to completion; flashcards never started
        assert_eq!(orchestrator.model().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected() {
        let orchestrator = GenerationOrchestrator::new(MockTextModel::new(), empty_search());
        let err = orchestrator
            .generate("<b></b>", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn test_join_results_uses_content_or_snippet() {
        let result = |content: Option<&str>, snippet: &str| SearchResult {
            title: String::new(),
            link: String::new(),
            snippet: snippet.to_string(),
            source: String::new(),
            content: content.map(str::to_string),
            priority: 10,
        };
        let joined = join_results(&[
            result(Some("scraped"), "snippet one"),
            result(None, "snippet two"),
            result(None, "  "),
        ]);
        assert_eq!(joined, "scraped\n\n---\n\nsnippet two");
    }

    #[tokio::test]
    async fn test_synoptic_searches_each_topic() {
        let model = MockTextModel::with_responses(["Connected summary of both topics."]);
        let orchestrator = GenerationOrchestrator::new(model, photosynthesis_search());
        let summary = orchestrator
            .synoptic(&["Photosynthesis".to_string(), "Respiration".to_string()])
            .await
            .unwrap();
        assert_eq!(summary, "Connected summary of both topics.");
        assert!(orchestrator.model().prompts()[0].contains("Photosynthesis, Respiration"));
    }
}
