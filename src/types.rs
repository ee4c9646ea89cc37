//! # Study Set Domain Types
//!
//! The artifacts a generation run produces and the persisted study set that
//! bundles them.
//!
//! Quiz questions are a tagged union: a multiple-choice question always carries
//! its four options and an index into them, a true-false question a boolean.
//! The serialized shape keeps the `type` discriminator (`"multiple-choice"` /
//! `"true-false"`) and the camelCase field names shared with the web and
//! mobile clients.

use serde::{Deserialize, Serialize};

/// Number of options every multiple-choice question carries
pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

/// A single question/answer card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// A quiz question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuizQuestion {
    #[serde(rename = "multiple-choice", rename_all = "camelCase")]
    MultipleChoice {
        id: String,
        question: String,
        options: [String; MULTIPLE_CHOICE_OPTIONS],
        correct_answer: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    #[serde(rename = "true-false", rename_all = "camelCase")]
    TrueFalse {
        id: String,
        question: String,
        correct_answer: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
}

/// An answer given when taking a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Boolean(bool),
}

impl QuizQuestion {
    pub fn id(&self) -> &str {
        match self {
            QuizQuestion::MultipleChoice { id, .. } | QuizQuestion::TrueFalse { id, .. } => id,
        }
    }

    pub fn set_id(&mut self, new_id: String) {
        match self {
            QuizQuestion::MultipleChoice { id, .. } | QuizQuestion::TrueFalse { id, .. } => {
                *id = new_id
            }
        }
    }

    pub fn question(&self) -> &str {
        match self {
            QuizQuestion::MultipleChoice { question, .. }
            | QuizQuestion::TrueFalse { question, .. } => question,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            QuizQuestion::MultipleChoice { explanation, .. }
            | QuizQuestion::TrueFalse { explanation, .. } => explanation.as_deref(),
        }
    }

    /// Whether `answer` is correct. An answer of the wrong kind is incorrect.
    pub fn grade(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (QuizQuestion::MultipleChoice { correct_answer, .. }, Answer::Choice(choice)) => {
                correct_answer == choice
            }
            (QuizQuestion::TrueFalse { correct_answer, .. }, Answer::Boolean(value)) => {
                correct_answer == value
            }
            (QuizQuestion::MultipleChoice { .. }, Answer::Boolean(_))
            | (QuizQuestion::TrueFalse { .. }, Answer::Choice(_)) => false,
        }
    }
}

/// A generated quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// Result of taking a quiz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
}

impl Quiz {
    /// Score a set of answers given in question order. Missing answers count
    /// as incorrect; extra answers are ignored.
    pub fn score(&self, answers: &[Answer]) -> QuizScore {
        let total = self.questions.len();
        let correct = self
            .questions
            .iter()
            .zip(answers)
            .filter(|(question, answer)| question.grade(answer))
            .count();
        let percentage = if total == 0 {
            0.0
        } else {
            correct as f64 * 100.0 / total as f64
        };
        QuizScore {
            correct,
            total,
            percentage,
        }
    }
}

/// Output of the sequential generation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMaterials {
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Quiz,
}

/// A persisted study set, owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySet {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Quiz,
    pub created_at: String,
    pub updated_at: String,
}

/// An entry in a user's topic history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_set_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Token accounting reported by a model or agent invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// Loosely-typed flashcard as returned by a model or delegated agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFlashcard {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// Loosely-typed quiz question as returned by a model or delegated agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuizQuestion {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<serde_json::Value>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Loosely-typed quiz as returned by a delegated agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuiz {
    #[serde(default)]
    pub questions: Vec<RawQuizQuestion>,
}

/// Transient result of the agent-delegated generation path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcards: Option<Vec<RawFlashcard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<RawQuiz>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn multiple_choice() -> QuizQuestion {
        QuizQuestion::MultipleChoice {
            id: "q-1".to_string(),
            question: "Which organelle performs photosynthesis?".to_string(),
            options: [
                "Mitochondria".to_string(),
                "Chloroplast".to_string(),
                "Nucleus".to_string(),
                "Ribosome".to_string(),
            ],
            correct_answer: 1,
            explanation: None,
        }
    }

    fn true_false() -> QuizQuestion {
        QuizQuestion::TrueFalse {
            id: "q-2".to_string(),
            question: "Plants release oxygen during photosynthesis.".to_string(),
            correct_answer: true,
            explanation: Some("Oxygen is a by-product.".to_string()),
        }
    }

    #[test]
    fn test_quiz_question_wire_format() {
        let value = serde_json::to_value(multiple_choice()).unwrap();
        assert_eq!(value["type"], "multiple-choice");
        assert_eq!(value["correctAnswer"], 1);
        assert_eq!(value["options"].as_array().unwrap().len(), 4);
        assert!(value.get("explanation").is_none());

        let value = serde_json::to_value(true_false()).unwrap();
        assert_eq!(value["type"], "true-false");
        assert_eq!(value["correctAnswer"], true);
    }

    #[test]
    fn test_quiz_question_rejects_wrong_option_count() {
        let raw = json!({
            "type": "multiple-choice",
            "id": "q",
            "question": "Too few options here?",
            "options": ["a", "b", "c"],
            "correctAnswer": 0
        });
        assert!(serde_json::from_value::<QuizQuestion>(raw).is_err());
    }

    #[test]
    fn test_grade_is_exhaustive() {
        let mc = multiple_choice();
        assert!(mc.grade(&Answer::Choice(1)));
        assert!(!mc.grade(&Answer::Choice(0)));
        assert!(!mc.grade(&Answer::Boolean(true)));

        let tf = true_false();
        assert!(tf.grade(&Answer::Boolean(true)));
        assert!(!tf.grade(&Answer::Boolean(false)));
        assert!(!tf.grade(&Answer::Choice(1)));
    }

    #[test]
    fn test_quiz_score() {
        let quiz = Quiz {
            id: "quiz-1".to_string(),
            title: "Generated Quiz".to_string(),
            questions: vec![multiple_choice(), true_false()],
        };

        let score = quiz.score(&[Answer::Choice(1), Answer::Boolean(false)]);
        assert_eq!(score.correct, 1);
        assert_eq!(score.total, 2);
        assert_eq!(score.percentage, 50.0);

        let score = quiz.score(&[Answer::Choice(1)]);
        assert_eq!(score.correct, 1);
    }

    #[test]
    fn test_answer_untagged() {
        let answers: Vec<Answer> = serde_json::from_str("[2, false]").unwrap();
        assert_eq!(answers, vec![Answer::Choice(2), Answer::Boolean(false)]);
    }

    #[test]
    fn test_study_set_camel_case() {
        let set = StudySet {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            topic: "Photosynthesis".to_string(),
            summary: "Plants make sugar.".to_string(),
            flashcards: vec![],
            quiz: Quiz {
                id: "quiz".to_string(),
                title: "Generated Quiz".to_string(),
                questions: vec![],
            },
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["userId"], "u1");
        assert!(value.get("createdAt").is_some());
    }
}
