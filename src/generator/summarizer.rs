//! Summary generation

use tracing::{debug, instrument};

use super::error::GenerationError;
use super::prompts;
use crate::model::TextModel;
use crate::sanitizer;

/// Content sent to the model is cut to this many characters
pub const MAX_SUMMARY_INPUT_CHARS: usize = 10_000;

/// Separator between joined content blocks
pub const CONTENT_SEPARATOR: &str = "\n\n---\n\n";

fn clamp(content: &str) -> String {
    content.chars().take(MAX_SUMMARY_INPUT_CHARS).collect()
}

/// Summarize gathered content about `topic`
///
/// The content is capped before prompting. The model's answer is sanitized
/// and must pass validation.
#[instrument(skip(model, content), fields(content_len = content.len()))]
pub async fn generate_summary<M: TextModel>(
    model: &M,
    topic: &str,
    content: &str,
) -> Result<String, GenerationError> {
    if content.trim().is_empty() {
        return Err(GenerationError::InvalidInput(
            "no content to summarize".to_string(),
        ));
    }
    let prompt = prompts::summarize(topic, &clamp(content));
    let summary = model.invoke(&prompt, prompts::SUMMARY_OPTIONS).await?;
    finish(summary)
}

/// Summarize material gathered for several topics, connecting them
#[instrument(skip(model, contents), fields(blocks = contents.len()))]
pub async fn generate_synoptic_summary<M: TextModel>(
    model: &M,
    topics: &[String],
    contents: &[String],
) -> Result<String, GenerationError> {
    if topics.is_empty() {
        return Err(GenerationError::InvalidInput(
            "at least one topic is required".to_string(),
        ));
    }
    let joined = contents
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(CONTENT_SEPARATOR);
    if joined.is_empty() {
        return Err(GenerationError::InvalidInput(
            "no content to summarize".to_string(),
        ));
    }
    let prompt = prompts::synoptic_summary(topics, &clamp(&joined));
    let summary = model.invoke(&prompt, prompts::SUMMARY_OPTIONS).await?;
    finish(summary)
}

fn finish(raw: String) -> Result<String, GenerationError> {
    let summary = sanitizer::sanitize(&raw);
    if summary.is_empty() || !sanitizer::validate(&summary) {
        return Err(GenerationError::SummaryValidation);
    }
    debug!(summary_len = summary.len(), "Generated summary");
    Ok(summary)
}
