//! Originality gate: compare a draft against everything already produced.

use crate::history::History;
use crate::script::Script;
use std::collections::HashMap;

/// Drafts at or above this similarity to a past video are rejected.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone)]
pub struct OriginalityReport {
    pub is_original: bool,
    pub max_similarity: f64,
    pub similar_title: String,
}

/// Check the draft against the full history. Empty history always passes.
pub fn check_originality(script: &Script, history: &History) -> OriginalityReport {
    let new_text = format!("{} {}", script.full_text(), script.title);

    let mut max_similarity = 0.0;
    let mut similar_title = String::new();

    for entry in history.entries() {
        let old_text = format!("{} {}", entry.script, entry.title);
        let sim = cosine_similarity(&new_text, &old_text);
        if sim > max_similarity {
            max_similarity = sim;
            similar_title = entry.title.clone();
        }
    }

    OriginalityReport {
        is_original: max_similarity < SIMILARITY_THRESHOLD,
        max_similarity,
        similar_title,
    }
}

/// Cosine similarity over term-frequency vectors. Tokens are lowercased runs
/// of alphanumerics, so punctuation and casing don't inflate similarity.
fn cosine_similarity(a: &str, b: &str) -> f64 {
    let tf_a = term_frequencies(a);
    let tf_b = term_frequencies(b);

    if tf_a.is_empty() || tf_b.is_empty() {
        return 0.0;
    }

    let dot: f64 = tf_a
        .iter()
        .filter_map(|(term, &count)| tf_b.get(term).map(|&other| count as f64 * other as f64))
        .sum();

    let norm_a: f64 = tf_a.values().map(|&c| (c as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = tf_b.values().map(|&c| (c as f64).powi(2)).sum::<f64>().sqrt();

    dot / (norm_a * norm_b)
}

fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use crate::script::{EmotionTag, ScriptStyle, Sentence};
    use chrono::Utc;
    use std::path::PathBuf;

    fn make_script(text: &str) -> Script {
        Script {
            title: "a title".into(),
            sentences: vec![Sentence {
                text: text.into(),
                emotion: EmotionTag::Neutral,
            }],
            style: ScriptStyle::Community,
            theme: "funny".into(),
            keywords: vec![],
            search_keywords: vec![],
            hashtags: vec![],
        }
    }

    fn history_with(script_text: &str, title: &str, dir: &std::path::Path) -> History {
        let mut history = History::load(&dir.join("history.json")).unwrap();
        history
            .append(HistoryEntry {
                timestamp: Utc::now(),
                title: title.into(),
                script: script_text.into(),
                style: "community".into(),
                theme: "funny".into(),
                quality_score: 90,
                duration_secs: 50.0,
                output_path: PathBuf::from("/out/a.mp4"),
            })
            .unwrap();
        history
    }

    #[test]
    fn test_identical_texts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let text = "the clerk followed the quiet customer into the night";
        let history = history_with(text, "the original", dir.path());
        let report = check_originality(&make_script(text), &history);
        assert!(!report.is_original);
        assert!(report.max_similarity > 0.9);
        assert_eq!(report.similar_title, "the original");
    }

    #[test]
    fn test_unrelated_texts_pass() {
        let dir = tempfile::tempdir().unwrap();
        let history = history_with(
            "a story about a haunted lighthouse keeper and fog",
            "lighthouse",
            dir.path(),
        );
        let report = check_originality(
            &make_script("budget airline seats keep shrinking every year"),
            &history,
        );
        assert!(report.is_original);
        assert!(report.max_similarity < 0.3);
    }

    #[test]
    fn test_empty_history_passes() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::load(&dir.path().join("history.json")).unwrap();
        let report = check_originality(&make_script("anything at all"), &history);
        assert!(report.is_original);
        assert_eq!(report.max_similarity, 0.0);
    }

    #[test]
    fn test_cosine_ignores_case_and_punctuation() {
        let sim = cosine_similarity("Hello, World!", "hello world");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_empty_is_zero() {
        assert_eq!(cosine_similarity("", "words here"), 0.0);
    }
}
