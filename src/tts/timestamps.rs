use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Word-level timing, either estimated or reported by a voice provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Estimate word-level timestamps by spreading the audio duration over the
/// words in proportion to their speaking weight. Words are contiguous; a word
/// that closes a clause or sentence absorbs the pause after it.
pub fn estimate_word_timestamps(text: &str, total_duration: f64) -> Vec<WordTimestamp> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || total_duration <= 0.0 {
        return Vec::new();
    }

    let weights: Vec<f64> = words.iter().map(|w| speaking_weight(w)).collect();
    let total_weight: f64 = weights.iter().sum();

    let mut timestamps = Vec::with_capacity(words.len());
    let mut cursor = 0.0_f64;
    for (i, word) in words.iter().enumerate() {
        let end = if i == words.len() - 1 {
            total_duration
        } else {
            cursor + weights[i] / total_weight * total_duration
        };
        timestamps.push(WordTimestamp {
            word: word.to_string(),
            start_secs: cursor,
            end_secs: end,
        });
        cursor = end;
    }

    timestamps
}

/// Per-word speaking cost: pronounceable characters plus a pause surcharge
/// for trailing punctuation.
fn speaking_weight(word: &str) -> f64 {
    let chars = word.chars().filter(|c| c.is_alphanumeric()).count().max(1) as f64;
    let pause = if word.ends_with(['.', '!', '?']) {
        3.0
    } else if word.ends_with([',', ';', ':']) {
        1.5
    } else {
        0.0
    };
    chars + pause
}

/// Clean narration text before sending it to a voice provider.
///
/// Subtitles keep the original text; only the audio uses this version.
/// Ellipses become commas so the voice pauses naturally instead of reading
/// punctuation, and leftover markup is dropped.
pub fn preprocess_for_tts(text: &str) -> String {
    static MULTI_COMMA: OnceLock<Regex> = OnceLock::new();
    static MULTI_SPACE: OnceLock<Regex> = OnceLock::new();

    let mut result = text.replace("**", "").replace('*', "");
    result = result.replace("...", ", ").replace("..", ", ");
    // emoticons and laugh runs read terribly aloud
    result = result.replace("lol", "").replace("lmao", "");

    let multi_comma = MULTI_COMMA.get_or_init(|| Regex::new(r",(\s*,)+").expect("static regex"));
    result = multi_comma.replace_all(&result, ",").into_owned();

    let multi_space = MULTI_SPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    result = multi_space.replace_all(&result, " ").into_owned();

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_basic() {
        let words = estimate_word_timestamps("The quick brown fox jumps", 5.0);
        assert_eq!(words.len(), 5);
        assert!(words[0].start_secs < 0.001);
        assert!((words.last().unwrap().end_secs - 5.0).abs() < 0.001);
        // All timestamps should be monotonically increasing
        for i in 1..words.len() {
            assert!(words[i].start_secs >= words[i - 1].end_secs);
        }
    }

    #[test]
    fn test_estimate_single_word() {
        let words = estimate_word_timestamps("Hello", 3.0);
        assert_eq!(words.len(), 1);
        assert!(words[0].start_secs.abs() < 0.001);
        assert!((words[0].end_secs - 3.0).abs() < 0.001);
        assert_eq!(words[0].word, "Hello");
    }

    #[test]
    fn test_estimate_empty_text() {
        let words = estimate_word_timestamps("", 5.0);
        assert!(words.is_empty());

        let words = estimate_word_timestamps("   ", 5.0);
        assert!(words.is_empty());
    }

    #[test]
    fn test_estimate_proportional() {
        let words = estimate_word_timestamps("I extraordinary", 10.0);
        assert_eq!(words.len(), 2);
        // "extraordinary" (13 chars) should get much more time than "I" (1 char)
        let dur_i = words[0].end_secs - words[0].start_secs;
        let dur_extra = words[1].end_secs - words[1].start_secs;
        assert!(dur_extra > dur_i * 5.0);
    }

    #[test]
    fn test_estimate_respects_duration() {
        let words = estimate_word_timestamps("one two three four five six seven", 2.5);
        assert_eq!(words.len(), 7);
        assert!((words.last().unwrap().end_secs - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_estimate_punctuation_absorbs_pause() {
        // same letters, but the sentence-final word carries the pause
        let words = estimate_word_timestamps("stop. stop", 4.0);
        let first = words[0].end_secs - words[0].start_secs;
        let second = words[1].end_secs - words[1].start_secs;
        assert!(first > second, "{first} vs {second}");
    }

    #[test]
    fn test_estimate_words_are_contiguous() {
        let words = estimate_word_timestamps("one two, three four.", 8.0);
        for pair in words.windows(2) {
            assert!((pair[0].end_secs - pair[1].start_secs).abs() < 1e-9);
        }
    }

    #[test]
    fn test_estimate_zero_duration() {
        let words = estimate_word_timestamps("Hello world", 0.0);
        assert!(words.is_empty());
    }

    #[test]
    fn test_preprocess_replaces_ellipses() {
        assert_eq!(
            preprocess_for_tts("Wait... it gets worse.."),
            "Wait, it gets worse,"
        );
    }

    #[test]
    fn test_preprocess_strips_markup_and_squeezes() {
        assert_eq!(
            preprocess_for_tts("**Huge**  twist   ahead"),
            "Huge twist ahead"
        );
    }

    #[test]
    fn test_preprocess_collapses_comma_runs() {
        assert_eq!(preprocess_for_tts("so,, , anyway"), "so, anyway");
    }
}
