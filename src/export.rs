//! Flashcard CSV and study-set JSON exports

use crate::types::{Flashcard, StudySet};

/// Quote a CSV field when it holds a comma, quote, CR or LF
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Flashcards as CSV with a `Question,Answer` header, one card per line
pub fn export_csv(flashcards: &[Flashcard]) -> String {
    let mut out = String::from("Question,Answer\n");
    for card in flashcards {
        out.push_str(&csv_field(&card.question));
        out.push(',');
        out.push_str(&csv_field(&card.answer));
        out.push('\n');
    }
    out
}

/// The full study set as pretty-printed JSON
pub fn export_json(study_set: &StudySet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(study_set)
}
