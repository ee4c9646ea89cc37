//! Prompt templates and sampling bounds for each generation task

use crate::model::InvokeOptions;

pub const SUMMARY_OPTIONS: InvokeOptions = InvokeOptions {
    max_tokens: 1000,
    temperature: 0.7,
};

pub const FLASHCARD_OPTIONS: InvokeOptions = InvokeOptions {
    max_tokens: 2000,
    temperature: 0.8,
};

pub const QUIZ_OPTIONS: InvokeOptions = InvokeOptions {
    max_tokens: 2000,
    temperature: 0.8,
};

pub fn summarize(topic: &str, content: &str) -> String {
    format!(
        r#"You are an expert educator. Summarize the following content about "{topic}" clearly and concisely, for students learning the topic.

Content:
{content}

Cover the key concepts, the main points and the important details.

Summary:"#
    )
}

pub fn synoptic_summary(topics: &[String], content: &str) -> String {
    format!(
        r#"You are an expert educator. Write a synoptic summary connecting these topics: {topics}

Content:
{content}

Explain how the topics relate to each other, where they connect and which themes run through all of them.

Synoptic Summary:"#,
        topics = topics.join(", ")
    )
}

pub fn flashcards(topic: &str, summary: &str, count: usize) -> String {
    format!(
        r#"You are an expert educator. Write {count} flashcards about "{topic}" from the summary below.

Summary:
{summary}

Each flashcard has a clear, concise question and a detailed, accurate answer.

Respond with a JSON array in exactly this shape:
[
  {{
    "question": "Question text",
    "answer": "Answer text"
  }}
]

Return ONLY the JSON array."#
    )
}

pub fn quiz(topic: &str, summary: &str, count: usize) -> String {
    format!(
        r#"You are an expert educator. Write {count} quiz questions about "{topic}" from the summary below.

Summary:
{summary}

Mix multiple-choice and true/false questions. Multiple-choice questions have 4 options and exactly one correct answer, given as the option's index.

Respond with a JSON array in exactly this shape:
[
  {{
    "type": "multiple-choice",
    "question": "Question text",
    "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
    "correctAnswer": 0,
    "explanation": "Why the answer is correct"
  }},
  {{
    "type": "true-false",
    "question": "Statement text",
    "correctAnswer": true,
    "explanation": "Why"
  }}
]

Return ONLY the JSON array."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        let prompt = flashcards("Photosynthesis", "Plants make sugar.", 10);
        assert!(prompt.contains("10 flashcards"));
        assert!(prompt.contains("\"Photosynthesis\""));
        assert!(prompt.contains("Plants make sugar."));
        assert!(prompt.contains("\"question\": \"Question text\""));

        let prompt = quiz("Cells", "Cells divide.", 5);
        assert!(prompt.contains("5 quiz questions"));
        assert!(prompt.contains("\"correctAnswer\": 0"));

        let prompt = synoptic_summary(&["A".to_string(), "B".to_string()], "text");
        assert!(prompt.contains("A, B"));
        assert!(prompt.trim_end().ends_with("Synoptic Summary:"));
    }
}
