//! Agent-delegated study-set generation

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::error::AgentError;
use super::runtime::{AgentClient, AgentRuntime};
use super::{AgentInvocationOptions, AgentResponse};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::generator::parsing::{strip_code_fence, ParseFailure, ParseStrategy, ParserChain};
use crate::generator::{build_flashcards, build_quiz};
use crate::sanitizer::{sanitize, validate};
use crate::types::{GeneratedMaterials, GenerationResult, RawFlashcard, RawQuiz};

/// Characters of raw completion kept when nothing structured is found
pub const FALLBACK_SUMMARY_CHARS: usize = 2000;

/// What the agent is asked to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentGenerationOptions {
    pub include_summary: bool,
    pub flashcard_count: usize,
    pub quiz_question_count: usize,
    pub timeout: Duration,
}

impl Default for AgentGenerationOptions {
    fn default() -> Self {
        Self {
            include_summary: true,
            flashcard_count: 10,
            quiz_question_count: 5,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// The instruction prompt for one study-set run
pub fn build_prompt(topic: &str, options: &AgentGenerationOptions) -> String {
    let mut lines = vec![
        format!("Generate a comprehensive study set for the topic: \"{topic}\""),
        String::new(),
        "Use the available action groups to:".to_string(),
        "1. Search for relevant content about this topic".to_string(),
        "2. Generate a clear, educational summary".to_string(),
        format!(
            "3. Create {} high-quality flashcards with questions and answers",
            options.flashcard_count
        ),
        format!(
            "4. Generate {} quiz questions (mix of multiple-choice and true/false)",
            options.quiz_question_count
        ),
        "5. Store the results using the DataStorage action group".to_string(),
        String::new(),
        "Requirements:".to_string(),
        "- Prioritize academic and educational sources".to_string(),
        "- Make flashcard questions specific and answers concise".to_string(),
        "- Give every multiple-choice question exactly 4 options".to_string(),
        "- Base every answer on the content you found".to_string(),
    ];
    if !options.include_summary {
        lines.push("- Skip summary generation if not needed".to_string());
    }
    lines.push(String::new());
    lines.push("Return the results in a structured format that can be stored.".to_string());
    lines.join("\n")
}

/// Study material read out of a completion, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMaterials {
    pub summary: Option<String>,
    pub flashcards: Option<Vec<RawFlashcard>>,
    pub quiz: Option<RawQuiz>,
}

impl ParsedMaterials {
    fn is_empty(&self) -> bool {
        self.summary.is_none() && self.flashcards.is_none() && self.quiz.is_none()
    }
}

fn quiz_from_value(value: Value) -> Option<RawQuiz> {
    match value {
        Value::Array(_) => serde_json::from_value(value)
            .ok()
            .map(|questions| RawQuiz { questions }),
        other => serde_json::from_value(other).ok(),
    }
}

fn non_empty_summary(text: &str) -> Option<String> {
    Some(sanitize(text)).filter(|s| !s.is_empty())
}

/// The completion is one JSON object with `summary`/`flashcards`/`quiz`
struct WholeObject;

impl ParseStrategy<ParsedMaterials> for WholeObject {
    fn name(&self) -> &'static str {
        "whole-object"
    }

    fn parse(&self, raw: &str) -> Result<ParsedMaterials, ParseFailure> {
        let value: Value = serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| ParseFailure::new(self.name(), e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(ParseFailure::new(self.name(), "not an object"));
        };
        let materials = ParsedMaterials {
            summary: map
                .remove("summary")
                .and_then(|v| v.as_str().and_then(non_empty_summary)),
            flashcards: map
                .remove("flashcards")
                .and_then(|v| serde_json::from_value(v).ok()),
            quiz: map.remove("quiz").and_then(quiz_from_value),
        };
        if materials.is_empty() {
            return Err(ParseFailure::new(
                self.name(),
                "object has no summary, flashcards or quiz",
            ));
        }
        Ok(materials)
    }
}

static SUMMARY_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)summary[:\s]+(.*?)(?:\n\n|flashcards|quiz|$)").expect("valid regex")
});
static FLASHCARDS_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)flashcards[:\s]*\[").expect("valid regex"));
static QUIZ_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)quiz[:\s]*\{").expect("valid regex"));

/// First JSON value starting at the last byte of `marker`'s match
fn json_after(marker: &Regex, raw: &str) -> Option<Value> {
    let found = marker.find(raw)?;
    let start = found.end() - 1;
    serde_json::Deserializer::from_str(&raw[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Labelled sections in prose, each read independently
struct LabelledSections;

impl ParseStrategy<ParsedMaterials> for LabelledSections {
    fn name(&self) -> &'static str {
        "labelled-sections"
    }

    fn parse(&self, raw: &str) -> Result<ParsedMaterials, ParseFailure> {
        let materials = ParsedMaterials {
            summary: SUMMARY_SECTION
                .captures(raw)
                .and_then(|caps| caps.get(1))
                .and_then(|m| non_empty_summary(m.as_str())),
            flashcards: json_after(&FLASHCARDS_SECTION, raw)
                .and_then(|v| serde_json::from_value(v).ok()),
            quiz: json_after(&QUIZ_SECTION, raw).and_then(quiz_from_value),
        };
        if materials.is_empty() {
            return Err(ParseFailure::new(self.name(), "no labelled sections found"));
        }
        Ok(materials)
    }
}

/// The start of the raw completion as a summary
struct RawSummary;

impl ParseStrategy<ParsedMaterials> for RawSummary {
    fn name(&self) -> &'static str {
        "raw-summary"
    }

    fn parse(&self, raw: &str) -> Result<ParsedMaterials, ParseFailure> {
        let head = raw.chars().take(FALLBACK_SUMMARY_CHARS).collect::<String>();
        let summary = non_empty_summary(&head)
            .ok_or_else(|| ParseFailure::new(self.name(), "empty completion"))?;
        Ok(ParsedMaterials {
            summary: Some(summary),
            ..Default::default()
        })
    }
}

fn response_chain() -> ParserChain<ParsedMaterials> {
    ParserChain::new()
        .with(WholeObject)
        .with(LabelledSections)
        .with(RawSummary)
}

/// Read a generation result out of an agent response
pub fn parse_response(response: &AgentResponse) -> GenerationResult {
    let materials = response_chain()
        .parse(&response.completion)
        .unwrap_or_default();
    GenerationResult {
        summary: materials.summary,
        flashcards: materials.flashcards,
        quiz: materials.quiz,
        session_id: response.session_id.clone(),
        trace_id: response.trace_id.clone(),
        usage: response.usage.clone(),
    }
}

/// Structural checks on a generation result
pub fn validate_result(result: &GenerationResult) -> bool {
    if result.summary.is_none() && result.flashcards.is_none() && result.quiz.is_none() {
        return false;
    }
    if let Some(summary) = &result.summary {
        if !validate(summary) {
            return false;
        }
    }
    if let Some(cards) = &result.flashcards {
        let complete = cards
            .iter()
            .all(|c| !c.question.trim().is_empty() && !c.answer.trim().is_empty());
        if !complete {
            return false;
        }
    }
    if let Some(quiz) = &result.quiz {
        let complete = quiz
            .questions
            .iter()
            .all(|q| !q.question.trim().is_empty() && q.correct_answer.is_some());
        if !complete {
            return false;
        }
    }
    true
}

/// Hands whole study-set runs to an agent
pub struct AgentOrchestrator<R> {
    client: AgentClient<R>,
}

impl<R: AgentRuntime> AgentOrchestrator<R> {
    pub fn new(client: AgentClient<R>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AgentClient<R> {
        &self.client
    }

    /// Generate a study set for `topic` through the agent
    #[instrument(skip(self, options))]
    pub async fn generate_study_set(
        &self,
        topic: &str,
        options: &AgentGenerationOptions,
    ) -> Result<GenerationResult, AgentError> {
        let topic = sanitize(topic);
        if topic.is_empty() || !validate(&topic) {
            return Err(AgentError::InvalidInput("Topic validation failed".to_string()));
        }

        let prompt = build_prompt(&topic, options);
        let defaults = self.client.defaults();
        let invocation = AgentInvocationOptions {
            session_id: None,
            enable_trace: defaults.enable_trace,
            max_iterations: defaults.max_iterations,
            timeout: options.timeout,
        };
        let response = self.client.invoke_with_retry(&prompt, &invocation).await?;

        let result = parse_response(&response);
        if !validate_result(&result) {
            warn!(session_id = %result.session_id, "Agent result failed validation");
            return Err(AgentError::InvalidResponse(
                "generated study set failed validation".to_string(),
            ));
        }
        info!(
            session_id = %result.session_id,
            has_summary = result.summary.is_some(),
            flashcards = result.flashcards.as_ref().map_or(0, Vec::len),
            quiz_questions = result.quiz.as_ref().map_or(0, |q| q.questions.len()),
            "Agent study set generated"
        );
        Ok(result)
    }
}

/// Typed study material from an agent result. All three parts are required.
pub fn into_materials(
    result: GenerationResult,
    options: &AgentGenerationOptions,
) -> Result<GeneratedMaterials, AgentError> {
    let missing = |part: &str| AgentError::InvalidResponse(format!("agent result has no {part}"));
    let summary = result.summary.ok_or_else(|| missing("summary"))?;
    let flashcards = build_flashcards(
        result.flashcards.ok_or_else(|| missing("flashcards"))?,
        options.flashcard_count,
    )
    .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
    let quiz = build_quiz(
        result.quiz.ok_or_else(|| missing("quiz"))?.questions,
        options.quiz_question_count,
    )
    .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
    Ok(GeneratedMaterials {
        summary,
        flashcards,
        quiz,
    })
}
