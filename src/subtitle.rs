use crate::script::{EmotionTag, Sentence};
use crate::tts::timestamps::WordTimestamp;

/// A single subtitle entry (one or more words shown together).
#[derive(Debug, Clone)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Per-word emotion labels, aligned with the narration's word order.
///
/// Each sentence contributes its emotion once per whitespace-separated word,
/// matching how the narration text is split into timestamps.
pub fn word_emotions(sentences: &[Sentence]) -> Vec<EmotionTag> {
    sentences
        .iter()
        .flat_map(|s| s.text.split_whitespace().map(|_| s.emotion))
        .collect()
}

/// Group word timestamps into subtitle entries.
///
/// At most `max_words_per_line` words per entry, and a chunk always breaks at
/// sentence-final punctuation so a subtitle never straddles two sentences.
/// When a non-neutral emotion is known for the chunk's opening word, its icon
/// is appended to the line. `emotions` may be shorter than `words` (or empty);
/// uncovered words are treated as neutral.
pub fn group_into_subtitles(
    words: &[WordTimestamp],
    max_words_per_line: usize,
    emotions: &[EmotionTag],
) -> Vec<SubtitleEntry> {
    if words.is_empty() {
        return Vec::new();
    }
    let max = max_words_per_line.max(1);
    let mut entries = Vec::new();
    let mut chunk: Vec<&WordTimestamp> = Vec::new();
    let mut chunk_start = 0;
    let mut index = 1;

    for (pos, word) in words.iter().enumerate() {
        chunk.push(word);
        let sentence_end = word
            .word
            .trim_end_matches(|c| c == '"' || c == '\'' || c == ')')
            .ends_with(['.', '!', '?']);

        if chunk.len() >= max || sentence_end {
            entries.push(flush_chunk(&chunk, index, emotions.get(chunk_start)));
            index += 1;
            chunk.clear();
            chunk_start = pos + 1;
        }
    }
    if !chunk.is_empty() {
        entries.push(flush_chunk(&chunk, index, emotions.get(chunk_start)));
    }

    entries
}

fn flush_chunk(
    chunk: &[&WordTimestamp],
    index: usize,
    emotion: Option<&EmotionTag>,
) -> SubtitleEntry {
    let mut text = chunk
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(icon) = emotion.and_then(|e| e.icon()) {
        text.push(' ');
        text.push_str(icon);
    }
    SubtitleEntry {
        index,
        start_secs: chunk[0].start_secs,
        end_secs: chunk[chunk.len() - 1].end_secs,
        text,
    }
}

/// Write subtitle entries as SRT format string.
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{}\n", entry.index));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(entry.start_secs),
            format_srt_time(entry.end_secs),
        ));
        out.push_str(&entry.text);
        out.push_str("\n\n");
    }
    out
}

/// Format seconds as SRT timestamp: "HH:MM:SS,mmm"
fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_from(text: &str) -> Vec<WordTimestamp> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| WordTimestamp {
                word: w.to_string(),
                start_secs: i as f64 * 0.5,
                end_secs: (i as f64 + 1.0) * 0.5,
            })
            .collect()
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.5), "00:01:05,500");
        assert_eq!(format_srt_time(3661.123), "01:01:01,123");
        assert_eq!(format_srt_time(0.999), "00:00:00,999");
    }

    #[test]
    fn test_group_caps_words_per_line() {
        let words = words_from("one two three four five six seven eight nine");
        let entries = group_into_subtitles(&words, 4, &[]);
        assert_eq!(entries.len(), 3); // 4+4+1
        assert_eq!(entries[0].text, "one two three four");
        assert_eq!(entries[2].text, "nine");
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[2].index, 3);
    }

    #[test]
    fn test_group_breaks_at_sentence_end() {
        let words = words_from("It ended. Then what happened next");
        let entries = group_into_subtitles(&words, 4, &[]);
        assert_eq!(entries[0].text, "It ended.");
        assert_eq!(entries[1].text, "Then what happened next");
    }

    #[test]
    fn test_group_breaks_after_quoted_punctuation() {
        let words = words_from("he said \"done.\" then left");
        let entries = group_into_subtitles(&words, 6, &[]);
        assert_eq!(entries[0].text, "he said \"done.\"");
        assert_eq!(entries[1].text, "then left");
    }

    #[test]
    fn test_entry_spans_chunk_timing() {
        let words = words_from("alpha beta gamma delta");
        let entries = group_into_subtitles(&words, 4, &[]);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].start_secs.abs() < 1e-9);
        assert!((entries[0].end_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_word_emotions_one_label_per_word() {
        let sentences = vec![
            Sentence {
                text: "I was furious.".into(),
                emotion: EmotionTag::Anger,
            },
            Sentence {
                text: "Then it passed.".into(),
                emotion: EmotionTag::Relief,
            },
        ];
        let emotions = word_emotions(&sentences);
        assert_eq!(emotions.len(), 6);
        assert_eq!(emotions[0], EmotionTag::Anger);
        assert_eq!(emotions[3], EmotionTag::Relief);
    }

    #[test]
    fn test_emotion_icon_appended_to_line() {
        let words = words_from("I was furious. Then it passed.");
        let emotions = word_emotions(&[
            Sentence {
                text: "I was furious.".into(),
                emotion: EmotionTag::Anger,
            },
            Sentence {
                text: "Then it passed.".into(),
                emotion: EmotionTag::Relief,
            },
        ]);
        let entries = group_into_subtitles(&words, 6, &emotions);
        assert_eq!(entries[0].text, "I was furious. 😡");
        assert_eq!(entries[1].text, "Then it passed. 😌");
    }

    #[test]
    fn test_neutral_lines_stay_unadorned() {
        let words = words_from("Nothing odd here.");
        let emotions = vec![EmotionTag::Neutral; 3];
        let entries = group_into_subtitles(&words, 6, &emotions);
        assert_eq!(entries[0].text, "Nothing odd here.");
    }

    #[test]
    fn test_to_srt_format() {
        let entries = vec![
            SubtitleEntry {
                index: 1,
                start_secs: 0.0,
                end_secs: 2.5,
                text: "Hello world".into(),
            },
            SubtitleEntry {
                index: 2,
                start_secs: 2.5,
                end_secs: 5.0,
                text: "Goodbye world".into(),
            },
        ];
        let srt = to_srt(&entries);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world\n"));
        assert!(srt.contains("2\n00:00:02,500 --> 00:00:05,000\nGoodbye world\n"));
    }

    #[test]
    fn test_group_empty() {
        let entries = group_into_subtitles(&[], 6, &[]);
        assert!(entries.is_empty());
    }
}
