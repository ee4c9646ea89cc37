//! Quiz generation

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::error::GenerationError;
use super::parsing::{describe_failures, quiz_chain};
use super::prompts;
use crate::model::TextModel;
use crate::sanitizer::sanitize;
use crate::types::{Quiz, QuizQuestion, RawQuizQuestion, MULTIPLE_CHOICE_OPTIONS};

/// Minimum length of a question after sanitizing
pub const MIN_QUESTION_CHARS: usize = 10;

pub const QUIZ_TITLE: &str = "Generated Quiz";

/// Generate a quiz of up to `count` questions about `topic` from a summary
#[instrument(skip(model, summary))]
pub async fn generate_quiz<M: TextModel>(
    model: &M,
    summary: &str,
    topic: &str,
    count: usize,
) -> Result<Quiz, GenerationError> {
    let prompt = prompts::quiz(topic, summary, count);
    let response = model.invoke(&prompt, prompts::QUIZ_OPTIONS).await?;
    parse_quiz(&response, count)
}

/// Parse, validate and cap the quiz in a model response
pub fn parse_quiz(response: &str, count: usize) -> Result<Quiz, GenerationError> {
    let raw = quiz_chain()
        .parse(response)
        .map_err(|failures| GenerationError::Parse {
            artifact: "quiz",
            reason: describe_failures(&failures),
        })?;
    build_quiz(raw, count)
}

/// Validate loosely-typed questions, keep up to `count` and assign ids
pub fn build_quiz(raw: Vec<RawQuizQuestion>, count: usize) -> Result<Quiz, GenerationError> {
    let parsed = raw.len();
    let stamp = Utc::now().timestamp_millis();
    let questions = raw
        .into_iter()
        .filter_map(validate_question)
        .take(count)
        .enumerate()
        .map(|(index, mut question)| {
            question.set_id(format!("q-{stamp}-{index}"));
            question
        })
        .collect::<Vec<_>>();

    if questions.is_empty() {
        return Err(GenerationError::NoValid("quiz questions"));
    }
    if questions.len() < parsed.min(count) {
        warn!(parsed, kept = questions.len(), "Dropped invalid quiz questions");
    }
    debug!(count = questions.len(), "Generated quiz");

    Ok(Quiz {
        id: format!("quiz-{stamp}"),
        title: QUIZ_TITLE.to_string(),
        questions,
    })
}

/// Index into the options, from a number or a numeric string
pub fn coerce_choice(value: &Value) -> Option<usize> {
    let index = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }?;
    (index < MULTIPLE_CHOICE_OPTIONS).then_some(index)
}

/// Boolean from `true`/`false` or their string forms
pub fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Build a typed question, or drop it when any structural check fails.
/// Without a `type` tag the shape decides: four options make a
/// multiple-choice question, a boolean answer a true-false one.
fn validate_question(raw: RawQuizQuestion) -> Option<QuizQuestion> {
    let question = sanitize(&raw.question);
    if question.chars().count() < MIN_QUESTION_CHARS {
        return None;
    }
    let explanation = raw
        .explanation
        .as_deref()
        .map(sanitize)
        .filter(|e| !e.is_empty());
    let answer = raw.correct_answer.as_ref()?;

    let kind = match raw.kind.as_deref().map(str::trim) {
        Some(kind) => kind.to_lowercase(),
        None if raw.options.is_some() => "multiple-choice".to_string(),
        None => "true-false".to_string(),
    };

    match kind.as_str() {
        "multiple-choice" => {
            let options = raw
                .options?
                .iter()
                .map(|o| sanitize(o))
                .collect::<Vec<_>>();
            if options.iter().any(String::is_empty) {
                return None;
            }
            let options: [String; MULTIPLE_CHOICE_OPTIONS] = options.try_into().ok()?;
            Some(QuizQuestion::MultipleChoice {
                id: String::new(),
                question,
                options,
                correct_answer: coerce_choice(answer)?,
                explanation,
            })
        }
        "true-false" => Some(QuizQuestion::TrueFalse {
            id: String::new(),
            question,
            correct_answer: coerce_boolean(answer)?,
            explanation,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockTextModel;
    use serde_json::json;

    fn mc(question: &str, options: Value, answer: Value) -> Value {
        json!({
            "type": "multiple-choice",
            "question": question,
            "options": options,
            "correctAnswer": answer,
            "explanation": "Because."
        })
    }

    #[test]
    fn test_structural_checks() {
        let response = json!([
            mc("Which has three options only?", json!(["a", "b", "c"]), json!(0)),
            mc("Which has an answer out of range?", json!(["a", "b", "c", "d"]), json!(5)),
            mc("Which answer is given as a string?", json!(["a", "b", "c", "d"]), json!("2")),
            {"type": "true-false", "question": "The sky is blue on clear days.", "correctAnswer": "true"},
            {"type": "true-false", "question": "Is this missing an answer?"},
            {"type": "essay", "question": "Describe the Krebs cycle fully."},
            {"type": "true-false", "question": "Short?", "correctAnswer": true}
        ])
        .to_string();

        let quiz = parse_quiz(&response, 5).unwrap();
        assert_eq!(quiz.title, "Generated Quiz");
        assert!(quiz.id.starts_with("quiz-"));
        assert_eq!(quiz.questions.len(), 2);

        match &quiz.questions[0] {
            QuizQuestion::MultipleChoice {
                correct_answer,
                explanation,
                ..
            } => {
                assert_eq!(*correct_answer, 2);
                assert_eq!(explanation.as_deref(), Some("Because."));
            }
            other => panic!("expected multiple choice, got {other:?}"),
        }
        assert!(matches!(
            quiz.questions[1],
            QuizQuestion::TrueFalse {
                correct_answer: true,
                ..
            }
        ));
        assert!(quiz.questions[1].id().ends_with("-1"));
    }

    #[test]
    fn test_untagged_questions_are_inferred() {
        let response = json!([
            {"question": "Which option is the second one?", "options": ["w", "x", "y", "z"], "correctAnswer": 1},
            {"question": "Water boils at 100C at sea level.", "correctAnswer": false}
        ])
        .to_string();
        let quiz = parse_quiz(&response, 5).unwrap();
        assert!(matches!(quiz.questions[0], QuizQuestion::MultipleChoice { correct_answer: 1, .. }));
        assert!(matches!(quiz.questions[1], QuizQuestion::TrueFalse { correct_answer: false, .. }));
    }

    #[tokio::test]
    async fn test_generate_quiz_caps_count() {
        let questions = (0..8)
            .map(|i| {
                json!({
                    "type": "true-false",
                    "question": format!("Statement number {i} is true."),
                    "correctAnswer": true
                })
            })
            .collect::<Vec<_>>();
        let model = MockTextModel::with_responses([serde_json::to_string(&questions).unwrap()]);

        let quiz = generate_quiz(&model, "summary", "Logic", 5).await.unwrap();
        assert_eq!(quiz.questions.len(), 5);
        assert!(model.prompts()[0].contains("5 quiz questions"));
        assert_eq!(model.options()[0], prompts::QUIZ_OPTIONS);
    }

    #[test]
    fn test_text_fallback() {
        let response = "1. Which gas do plants release?\nA) Oxygen\nB) Nitrogen\nC) Argon\nD) Neon\nAnswer: A";
        let quiz = parse_quiz(response, 5).unwrap();
        assert_eq!(quiz.questions.len(), 1);
        assert!(matches!(quiz.questions[0], QuizQuestion::MultipleChoice { correct_answer: 0, .. }));
    }

    #[test]
    fn test_no_valid_questions() {
        let response = json!([mc("Only three options here?", json!(["a", "b", "c"]), json!(0))]).to_string();
        let err = parse_quiz(&response, 5).unwrap_err();
        assert_eq!(err.to_string(), "No valid quiz questions generated");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_choice(&json!(3)), Some(3));
        assert_eq!(coerce_choice(&json!(4)), None);
        assert_eq!(coerce_choice(&json!(-1)), None);
        assert_eq!(coerce_choice(&json!(" 1 ")), Some(1));
        assert_eq!(coerce_choice(&json!(1.5)), None);
        assert_eq!(coerce_boolean(&json!("TRUE")), Some(true));
        assert_eq!(coerce_boolean(&json!(0)), None);
    }
}
