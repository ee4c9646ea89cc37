//! # Model Response Parsing
//!
//! Models are asked for JSON but often wrap it in prose, fence it, or answer
//! in plain text. A [`ParserChain`] tries an ordered list of strategies and
//! returns the first success; every strategy reports failure as a value.
//!
//! Strategies provided here:
//!
//! - [`EmbeddedJsonArray`]: the outermost `[...]` span in the text
//! - [`WholeJson`]: the whole (unfenced) text as an array, or an object
//!   holding the array under a known key
//! - [`QaLines`]: `Q:`/`A:` line pairs, for flashcards
//! - [`QuizText`]: numbered questions with lettered options and `Answer:`
//!   lines, or `True or False:` statements, for quizzes

use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{RawFlashcard, RawQuizQuestion};

/// Why one strategy could not parse a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{strategy}: {reason}")]
pub struct ParseFailure {
    pub strategy: &'static str,
    pub reason: String,
}

impl ParseFailure {
    pub(crate) fn new(strategy: &'static str, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            reason: reason.into(),
        }
    }
}

/// One way of reading a value out of a model response
pub trait ParseStrategy<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// The parsed value, or why there is none. List strategies never
    /// succeed with an empty list.
    fn parse(&self, raw: &str) -> Result<T, ParseFailure>;
}

/// Strategies tried in order until one succeeds
pub struct ParserChain<T> {
    strategies: Vec<Box<dyn ParseStrategy<T>>>,
}

impl<T> ParserChain<T> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with(mut self, strategy: impl ParseStrategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Value from the first strategy that succeeds, or every failure in order
    pub fn parse(&self, raw: &str) -> Result<T, Vec<ParseFailure>> {
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.parse(raw) {
                Ok(value) => {
                    if !failures.is_empty() {
                        warn!(
                            strategy = strategy.name(),
                            skipped = failures.len(),
                            "Fell back to a later parse strategy"
                        );
                    }
                    debug!(strategy = strategy.name(), "Parsed model response");
                    return Ok(value);
                }
                Err(failure) => failures.push(failure),
            }
        }
        Err(failures)
    }
}

impl<T> Default for ParserChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a list of failures as one message
pub fn describe_failures(failures: &[ParseFailure]) -> String {
    if failures.is_empty() {
        return "no parse strategies configured".to_string();
    }
    failures
        .iter()
        .map(ParseFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parser for flashcard responses
pub fn flashcard_chain() -> ParserChain<Vec<RawFlashcard>> {
    ParserChain::new()
        .with(EmbeddedJsonArray::<RawFlashcard>::new())
        .with(WholeJson::<RawFlashcard>::new("flashcards"))
        .with(QaLines)
}

/// Parser for quiz responses
pub fn quiz_chain() -> ParserChain<Vec<RawQuizQuestion>> {
    ParserChain::new()
        .with(EmbeddedJsonArray::<RawQuizQuestion>::new())
        .with(WholeJson::<RawQuizQuestion>::new("questions"))
        .with(QuizText)
}

/// Keep the array elements that deserialize as `T`
fn items_from_values<T: DeserializeOwned>(
    strategy: &'static str,
    values: Vec<Value>,
) -> Result<Vec<T>, ParseFailure> {
    if values.is_empty() {
        return Err(ParseFailure::new(strategy, "empty array"));
    }
    let total = values.len();
    let items = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<T>(value).ok())
        .collect::<Vec<_>>();
    if items.is_empty() {
        return Err(ParseFailure::new(
            strategy,
            format!("none of {total} elements had the expected shape"),
        ));
    }
    Ok(items)
}

pub struct EmbeddedJsonArray<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> EmbeddedJsonArray<T> {
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for EmbeddedJsonArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ParseStrategy<Vec<T>> for EmbeddedJsonArray<T> {
    fn name(&self) -> &'static str {
        "embedded-json-array"
    }

    fn parse(&self, raw: &str) -> Result<Vec<T>, ParseFailure> {
        let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
            return Err(ParseFailure::new(self.name(), "no JSON array found"));
        };
        if end < start {
            return Err(ParseFailure::new(self.name(), "no JSON array found"));
        }
        let values: Vec<Value> = serde_json::from_str(&raw[start..=end])
            .map_err(|e| ParseFailure::new(self.name(), e.to_string()))?;
        items_from_values(self.name(), values)
    }
}

pub struct WholeJson<T> {
    key: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> WholeJson<T> {
    /// `key` names the field that holds the array when the response is an object
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            _item: PhantomData,
        }
    }
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid regex"));

pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
}

impl<T: DeserializeOwned> ParseStrategy<Vec<T>> for WholeJson<T> {
    fn name(&self) -> &'static str {
        "whole-json"
    }

    fn parse(&self, raw: &str) -> Result<Vec<T>, ParseFailure> {
        let value: Value = serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| ParseFailure::new(self.name(), e.to_string()))?;
        match value {
            Value::Array(values) => items_from_values(self.name(), values),
            Value::Object(mut map) => match map.remove(self.key) {
                Some(Value::Array(values)) => items_from_values(self.name(), values),
                _ => Err(ParseFailure::new(
                    self.name(),
                    format!("object has no `{}` array", self.key),
                )),
            },
            _ => Err(ParseFailure::new(self.name(), "not an array or object")),
        }
    }
}

static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:q\s*\d*|question\s*\d*)\s*[:.]\s*(.*)$").expect("valid regex")
});
static ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:a\s*\d*|answer\s*\d*)\s*[:.]\s*(.*)$").expect("valid regex")
});

/// `Q:`/`A:` line pairs. Lines that match neither continue the current field.
pub struct QaLines;

#[derive(PartialEq)]
enum QaField {
    None,
    Question,
    Answer,
}

impl ParseStrategy<Vec<RawFlashcard>> for QaLines {
    fn name(&self) -> &'static str {
        "qa-lines"
    }

    fn parse(&self, raw: &str) -> Result<Vec<RawFlashcard>, ParseFailure> {
        let mut cards = Vec::new();
        let mut current = RawFlashcard::default();
        let mut field = QaField::None;

        let mut flush = |card: &mut RawFlashcard| {
            let card = std::mem::take(card);
            if !card.question.trim().is_empty() && !card.answer.trim().is_empty() {
                cards.push(RawFlashcard {
                    question: card.question.trim().to_string(),
                    answer: card.answer.trim().to_string(),
                });
            }
        };

        for line in raw.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = QUESTION_LINE.captures(line) {
                flush(&mut current);
                current.question = caps[1].to_string();
                field = QaField::Question;
            } else if let Some(caps) = ANSWER_LINE.captures(line) {
                current.answer = caps[1].to_string();
                field = QaField::Answer;
            } else {
                let target = match field {
                    QaField::Question => &mut current.question,
                    QaField::Answer => &mut current.answer,
                    QaField::None => continue,
                };
                target.push(' ');
                target.push_str(line);
            }
        }
        flush(&mut current);

        if cards.is_empty() {
            return Err(ParseFailure::new(self.name(), "no question/answer pairs found"));
        }
        Ok(cards)
    }
}

static QUIZ_QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\d+\s*[.)]|q\s*\d*\s*[:.]|question\s*\d*\s*[:.])\s*(.+)$")
        .expect("valid regex")
});
static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?([A-Da-d])\s*[).:]\s*(.+)$").expect("valid regex"));
static QUIZ_ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:correct\s+)?answer\s*[:.\-]\s*(.+)$").expect("valid regex")
});
static EXPLANATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^explanation\s*[:.\-]\s*(.+)$").expect("valid regex"));
static TRUE_FALSE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^true\s+or\s+false\s*[:?\-]?\s*").expect("valid regex"));
static LETTER_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?([A-Da-d])(?:\s*[).:]|$)").expect("valid regex"));

/// Numbered plain-text quiz questions
pub struct QuizText;

#[derive(Default)]
struct PendingQuestion {
    question: String,
    true_false: bool,
    options: Vec<String>,
    answer: Option<String>,
    explanation: Option<String>,
}

impl PendingQuestion {
    fn into_raw(self) -> Option<RawQuizQuestion> {
        let answer = self.answer?.trim().to_string();
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return None;
        }

        if self.options.is_empty() || self.true_false {
            let value = match answer.to_lowercase().trim_end_matches('.') {
                "true" | "t" => true,
                "false" | "f" => false,
                _ => return None,
            };
            return Some(RawQuizQuestion {
                kind: Some("true-false".to_string()),
                question,
                options: None,
                correct_answer: Some(Value::Bool(value)),
                explanation: self.explanation,
            });
        }

        let index = LETTER_ANSWER
            .captures(&answer)
            .and_then(|caps| caps[1].chars().next())
            .map(|letter| (letter.to_ascii_uppercase() as u8 - b'A') as usize)
            .or_else(|| {
                self.options
                    .iter()
                    .position(|option| option.eq_ignore_ascii_case(&answer))
            })?;

        Some(RawQuizQuestion {
            kind: Some("multiple-choice".to_string()),
            question,
            options: Some(self.options),
            correct_answer: Some(json!(index)),
            explanation: self.explanation,
        })
    }
}

impl ParseStrategy<Vec<RawQuizQuestion>> for QuizText {
    fn name(&self) -> &'static str {
        "quiz-text"
    }

    fn parse(&self, raw: &str) -> Result<Vec<RawQuizQuestion>, ParseFailure> {
        let mut questions = Vec::new();
        let mut current: Option<PendingQuestion> = None;

        for line in raw.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = QUIZ_ANSWER_LINE.captures(line) {
                if let Some(pending) = current.as_mut() {
                    pending.answer = Some(caps[1].to_string());
                }
            } else if let Some(caps) = EXPLANATION_LINE.captures(line) {
                if let Some(pending) = current.as_mut() {
                    pending.explanation = Some(caps[1].trim().to_string());
                }
            } else if let Some(caps) = OPTION_LINE
                .captures(line)
                .filter(|_| current.as_ref().is_some_and(|p| !p.true_false))
            {
                if let Some(pending) = current.as_mut() {
                    pending.options.push(caps[2].trim().to_string());
                }
            } else if let Some(caps) = QUIZ_QUESTION_LINE.captures(line) {
                if let Some(done) = current.take().and_then(PendingQuestion::into_raw) {
                    questions.push(done);
                }
                current = Some(pending_from(&caps[1]));
            } else if TRUE_FALSE_PREFIX.is_match(line) {
                if let Some(done) = current.take().and_then(PendingQuestion::into_raw) {
                    questions.push(done);
                }
                current = Some(pending_from(line));
            } else if let Some(pending) = current.as_mut() {
                if pending.options.is_empty() && pending.answer.is_none() {
                    pending.question.push(' ');
                    pending.question.push_str(line);
                }
            }
        }
        if let Some(done) = current.and_then(PendingQuestion::into_raw) {
            questions.push(done);
        }

        if questions.is_empty() {
            return Err(ParseFailure::new(self.name(), "no quiz questions found"));
        }
        Ok(questions)
    }
}

fn pending_from(text: &str) -> PendingQuestion {
    let text = text.trim();
    match TRUE_FALSE_PREFIX.find(text) {
        Some(prefix) => PendingQuestion {
            question: text[prefix.end()..].to_string(),
            true_false: true,
            ..Default::default()
        },
        None => PendingQuestion {
            question: text.to_string(),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_array_in_prose() {
        let raw = r#"Sure! Here are your flashcards:
[{"question": "What is photosynthesis?", "answer": "Turning light into chemical energy."}]
Hope this helps."#;
        let cards = flashcard_chain().parse(raw).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "What is photosynthesis?");
    }

    #[test]
    fn test_whole_json_object_with_key() {
        let raw = "```json\n{\"flashcards\": [{\"question\": \"Q one here?\", \"answer\": \"A one here.\"}]}\n```";
        // The embedded array inside the object is found first
        let cards = flashcard_chain().parse(raw).unwrap();
        assert_eq!(cards.len(), 1);

        let strategy = WholeJson::<RawFlashcard>::new("flashcards");
        assert_eq!(strategy.parse(raw).unwrap().len(), 1);
        assert!(strategy.parse("{\"cards\": []}").is_err());
    }

    #[test]
    fn test_malformed_json_falls_back_to_qa_lines() {
        let raw = r#"[{"question": "broken",
Q: What pigment absorbs light in plants?
A: Chlorophyll, found in the
chloroplasts.
Question 2: Where does the Calvin cycle occur?
Answer 2: In the stroma of the chloroplast."#;
        let cards = flashcard_chain().parse(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].answer, "Chlorophyll, found in the chloroplasts.");
        assert_eq!(cards[1].question, "Where does the Calvin cycle occur?");
    }

    #[test]
    fn test_chain_reports_every_failure() {
        let failures = flashcard_chain().parse("nothing useful here").unwrap_err();
        let names = failures.iter().map(|f| f.strategy).collect::<Vec<_>>();
        assert_eq!(names, vec!["embedded-json-array", "whole-json", "qa-lines"]);
        assert!(describe_failures(&failures).contains("qa-lines"));
    }

    #[test]
    fn test_empty_array_is_a_failure() {
        let strategy = EmbeddedJsonArray::<RawFlashcard>::new();
        assert!(strategy.parse("[]").is_err());
    }

    #[test]
    fn test_quiz_json_keeps_loose_values() {
        let raw = r#"[{"type": "true-false", "question": "Plants need light.", "correctAnswer": "true"}]"#;
        let questions = quiz_chain().parse(raw).unwrap();
        assert_eq!(questions[0].correct_answer, Some(json!("true")));
    }

    #[test]
    fn test_quiz_text_fallback() {
        let raw = "Here is your quiz.
1. Which organelle performs photosynthesis?
A) Mitochondria
B) Chloroplast
C) Nucleus
D) Ribosome
Answer: B
Explanation: Chloroplasts contain chlorophyll.

2. True or False: Photosynthesis releases oxygen.
Answer: True

3) What gas do plants absorb?
a. Oxygen
b. Nitrogen
c. Carbon dioxide
d. Helium
Correct answer: Carbon dioxide";
        let questions = QuizText.parse(raw).unwrap();
        assert_eq!(questions.len(), 3);

        assert_eq!(questions[0].kind.as_deref(), Some("multiple-choice"));
        assert_eq!(questions[0].options.as_ref().map(Vec::len), Some(4));
        assert_eq!(questions[0].correct_answer, Some(json!(1)));
        assert_eq!(
            questions[0].explanation.as_deref(),
            Some("Chloroplasts contain chlorophyll.")
        );

        assert_eq!(questions[1].kind.as_deref(), Some("true-false"));
        assert_eq!(questions[1].question, "Photosynthesis releases oxygen.");
        assert_eq!(questions[1].correct_answer, Some(json!(true)));

        assert_eq!(questions[2].correct_answer, Some(json!(2)));
    }

    #[test]
    fn test_quiz_text_without_answers_fails() {
        assert!(QuizText.parse("1. A question with no answer?\nA) x\nB) y").is_err());
    }
}
