pub mod generator;
pub mod prompt;

use serde::{Deserialize, Serialize};

/// Emotional register attached to each narration sentence. Drives subtitle
/// styling and keeps the LLM payload constrained to a known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Anger,
    Fun,
    Surprise,
    Neutral,
    Sad,
    Tension,
    Relief,
    Shock,
}

impl EmotionTag {
    /// Lenient parse: unknown labels collapse to `Neutral` rather than
    /// failing the whole script, since LLMs occasionally invent tags.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "anger" | "angry" => EmotionTag::Anger,
            "fun" | "funny" | "joy" => EmotionTag::Fun,
            "surprise" | "surprised" => EmotionTag::Surprise,
            "sad" | "sadness" => EmotionTag::Sad,
            "tension" | "tense" | "suspense" => EmotionTag::Tension,
            "relief" | "relieved" => EmotionTag::Relief,
            "shock" | "shocked" => EmotionTag::Shock,
            _ => EmotionTag::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Anger => "anger",
            EmotionTag::Fun => "fun",
            EmotionTag::Surprise => "surprise",
            EmotionTag::Neutral => "neutral",
            EmotionTag::Sad => "sad",
            EmotionTag::Tension => "tension",
            EmotionTag::Relief => "relief",
            EmotionTag::Shock => "shock",
        }
    }

    /// Marker appended to subtitles carrying this emotion. Neutral lines
    /// stay unadorned.
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            EmotionTag::Anger => Some("😡"),
            EmotionTag::Fun => Some("😂"),
            EmotionTag::Surprise => Some("😮"),
            EmotionTag::Sad => Some("😢"),
            EmotionTag::Tension => Some("😰"),
            EmotionTag::Relief => Some("😌"),
            EmotionTag::Shock => Some("🤯"),
            EmotionTag::Neutral => None,
        }
    }
}

/// Narrative voice the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStyle {
    Creative,
    Analytical,
    Emotional,
    Humorous,
    Expert,
    /// Story retold from a community post; the crawl stage supplies the post.
    Community,
}

impl ScriptStyle {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "creative" => Some(ScriptStyle::Creative),
            "analytical" => Some(ScriptStyle::Analytical),
            "emotional" => Some(ScriptStyle::Emotional),
            "humorous" => Some(ScriptStyle::Humorous),
            "expert" => Some(ScriptStyle::Expert),
            "community" => Some(ScriptStyle::Community),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStyle::Creative => "creative",
            ScriptStyle::Analytical => "analytical",
            ScriptStyle::Emotional => "emotional",
            ScriptStyle::Humorous => "humorous",
            ScriptStyle::Expert => "expert",
            ScriptStyle::Community => "community",
        }
    }

    pub const ALL: [ScriptStyle; 6] = [
        ScriptStyle::Creative,
        ScriptStyle::Analytical,
        ScriptStyle::Emotional,
        ScriptStyle::Humorous,
        ScriptStyle::Expert,
        ScriptStyle::Community,
    ];
}

/// One narration sentence with its emotional register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub emotion: EmotionTag,
}

/// A generated script ready for narration and composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub sentences: Vec<Sentence>,
    pub style: ScriptStyle,
    /// Visual theme label ("horror", "funny", ...) used by the background and
    /// music stages.
    pub theme: String,
    /// Topic keywords for publishing metadata.
    pub keywords: Vec<String>,
    /// English search terms for stock footage lookup.
    pub search_keywords: Vec<String>,
    pub hashtags: Vec<String>,
}

impl Script {
    /// The full narration as a single string, the unit TTS operates on.
    pub fn full_text(&self) -> String {
        self.sentences
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn char_count(&self) -> usize {
        self.full_text().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_parse_lenient() {
        assert_eq!(EmotionTag::parse_lenient("shock"), EmotionTag::Shock);
        assert_eq!(EmotionTag::parse_lenient("  Tension "), EmotionTag::Tension);
        assert_eq!(EmotionTag::parse_lenient("funny"), EmotionTag::Fun);
        assert_eq!(EmotionTag::parse_lenient("ecstatic"), EmotionTag::Neutral);
        assert_eq!(EmotionTag::parse_lenient(""), EmotionTag::Neutral);
    }

    #[test]
    fn test_style_parse_roundtrip() {
        for style in ScriptStyle::ALL {
            assert_eq!(ScriptStyle::parse(style.as_str()), Some(style));
        }
        assert_eq!(ScriptStyle::parse("poetic"), None);
    }

    #[test]
    fn test_full_text_joins_and_skips_empty() {
        let script = Script {
            title: "t".into(),
            sentences: vec![
                Sentence {
                    text: "First.".into(),
                    emotion: EmotionTag::Neutral,
                },
                Sentence {
                    text: "  ".into(),
                    emotion: EmotionTag::Neutral,
                },
                Sentence {
                    text: "Second.".into(),
                    emotion: EmotionTag::Shock,
                },
            ],
            style: ScriptStyle::Community,
            theme: "mystery".into(),
            keywords: vec![],
            search_keywords: vec![],
            hashtags: vec![],
        };
        assert_eq!(script.full_text(), "First. Second.");
        assert_eq!(script.char_count(), 14);
    }
}
