//! Flashcard generation

use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::error::GenerationError;
use super::parsing::{describe_failures, flashcard_chain};
use super::prompts;
use crate::model::TextModel;
use crate::sanitizer::sanitize;
use crate::types::{Flashcard, RawFlashcard};

/// Minimum length of a card's question and answer after sanitizing
pub const MIN_FIELD_CHARS: usize = 10;

/// Generate up to `count` flashcards about `topic` from a summary
#[instrument(skip(model, summary))]
pub async fn generate_flashcards<M: TextModel>(
    model: &M,
    summary: &str,
    topic: &str,
    count: usize,
) -> Result<Vec<Flashcard>, GenerationError> {
    let prompt = prompts::flashcards(topic, summary, count);
    let response = model.invoke(&prompt, prompts::FLASHCARD_OPTIONS).await?;
    parse_flashcards(&response, count)
}

/// Parse, validate and cap the flashcards in a model response
pub fn parse_flashcards(response: &str, count: usize) -> Result<Vec<Flashcard>, GenerationError> {
    let raw = flashcard_chain()
        .parse(response)
        .map_err(|failures| GenerationError::Parse {
            artifact: "flashcards",
            reason: describe_failures(&failures),
        })?;
    build_flashcards(raw, count)
}

/// Validate loosely-typed cards, keep up to `count` and assign ids
pub fn build_flashcards(
    raw: Vec<RawFlashcard>,
    count: usize,
) -> Result<Vec<Flashcard>, GenerationError> {
    let parsed = raw.len();
    let stamp = Utc::now().timestamp_millis();
    let cards = raw
        .into_iter()
        .filter_map(validate_card)
        .take(count)
        .enumerate()
        .map(|(index, (question, answer))| Flashcard {
            id: format!("fc-{stamp}-{index}"),
            question,
            answer,
        })
        .collect::<Vec<_>>();

    if cards.is_empty() {
        return Err(GenerationError::NoValid("flashcards"));
    }
    if cards.len() < parsed.min(count) {
        warn!(parsed, kept = cards.len(), "Dropped invalid flashcards");
    }
    debug!(count = cards.len(), "Generated flashcards");
    Ok(cards)
}

fn validate_card(card: RawFlashcard) -> Option<(String, String)> {
    let question = sanitize(&card.question);
    let answer = sanitize(&card.answer);
    if question.chars().count() < MIN_FIELD_CHARS || answer.chars().count() < MIN_FIELD_CHARS {
        return None;
    }
    Some((question, answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockTextModel;
    use serde_json::json;

    fn cards_json(n: usize) -> String {
        let cards = (0..n)
            .map(|i| {
                json!({
                    "question": format!("What is fact number {i}?"),
                    "answer": format!("Fact number {i} is important."),
                })
            })
            .collect::<Vec<_>>();
        serde_json::to_string(&cards).unwrap()
    }

    #[tokio::test]
    async fn test_caps_to_requested_count() {
        let model = MockTextModel::with_responses([cards_json(14)]);
        let cards = generate_flashcards(&model, "Summary text", "Facts", 10)
            .await
            .unwrap();

        assert_eq!(cards.len(), 10);
        assert!(cards.iter().all(|c| c.question.len() >= MIN_FIELD_CHARS
            && c.answer.len() >= MIN_FIELD_CHARS));
        assert!(cards[0].id.starts_with("fc-"));
        assert!(cards[9].id.ends_with("-9"));
        assert_eq!(model.options()[0], prompts::FLASHCARD_OPTIONS);
    }

    #[test]
    fn test_invalid_cards_are_dropped_before_capping() {
        let response = json!([
            {"question": "Short?", "answer": "This answer is long enough."},
            {"question": "What is the first valid question?", "answer": "The first valid answer."},
            {"question": "<script>x</script>", "answer": "Sanitized away entirely"},
            {"question": "What is the second valid question?", "answer": "The second valid answer."},
            {"question": "What is the third valid question?", "answer": "The third valid answer."}
        ])
        .to_string();

        let cards = parse_flashcards(&response, 2).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards[0].question.contains("first"));
        assert!(cards[1].question.contains("second"));
    }

    #[test]
    fn test_text_fallback_recovers_cards() {
        let response = "Flashcards:\nQ: What does chlorophyll absorb?\nA: Mostly red and blue light.\nQ: Where are chloroplasts found?\nA: In the cells of leaves.";
        let cards = parse_flashcards(response, 10).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].answer, "In the cells of leaves.");
    }

    #[test]
    fn test_all_invalid_is_an_error() {
        let response = json!([{"question": "Too short", "answer": "Nope"}]).to_string();
        let err = parse_flashcards(&response, 10).unwrap_err();
        assert_eq!(err.to_string(), "No valid flashcards generated");
    }

    #[test]
    fn test_unparseable_is_an_error() {
        let err = parse_flashcards("I cannot help with that.", 10).unwrap_err();
        assert!(matches!(err, GenerationError::Parse { artifact: "flashcards", .. }));
    }
}
