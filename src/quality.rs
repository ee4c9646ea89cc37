//! Heuristic quality scoring for gathered content

use std::collections::HashSet;

/// Quality score in `0..=100` with the issues that lowered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuality {
    pub score: u32,
    pub issues: Vec<String>,
}

pub fn assess_quality(content: &str) -> ContentQuality {
    let mut issues = Vec::new();
    let mut score: i32 = 100;

    if content.chars().count() < 100 {
        issues.push("Content too short".to_string());
        score -= 30;
    }

    let meaningful = content
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>();
    if meaningful.trim().chars().count() < 50 {
        issues.push("Insufficient meaningful content".to_string());
        score -= 20;
    }

    let lowered = content.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if !words.is_empty() {
        let unique: HashSet<&str> = words.iter().copied().collect();
        if (unique.len() as f64) / (words.len() as f64) < 0.3 {
            issues.push("High repetition detected".to_string());
            score -= 15;
        }
    }

    if content.contains("error") || content.contains("404") || content.contains("not found") {
        issues.push("Error content detected".to_string());
        score -= 25;
    }

    ContentQuality {
        score: score.max(0) as u32,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_content_scores_full() {
        let text = "Photosynthesis is the process by which green plants and some other \
                    organisms use sunlight to synthesize foods from carbon dioxide and water.";
        let quality = assess_quality(text);
        assert_eq!(quality.score, 100);
        assert!(quality.issues.is_empty());
    }

    #[test]
    fn test_short_error_page() {
        let quality = assess_quality("404 not found");
        assert_eq!(quality.score, 25);
        assert_eq!(quality.issues.len(), 3);
    }

    #[test]
    fn test_repetition() {
        let text = "spam ".repeat(40);
        let quality = assess_quality(&text);
        assert!(quality.issues.iter().any(|i| i.contains("repetition")));
    }
}
