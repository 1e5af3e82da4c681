//! LLM-backed script generation with a Gemini -> OpenAI fallback chain.

use crate::config::Settings;
use crate::error::{provider_error, ShortgenError, ShortgenResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::script::prompt;
use crate::script::{EmotionTag, Script, ScriptStyle, Sentence};
use serde::Deserialize;
use tracing::{info, warn};

const GEMINI_MODEL: &str = "gemini-2.0-flash";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Gemini,
    OpenAi,
}

/// Seam between the generator and the model providers, so the regeneration
/// logic is exercisable without a network.
trait LlmBackend: Send + Sync {
    fn complete(&self, prompt_text: &str) -> ShortgenResult<(String, Backend)>;
}

pub struct ScriptGenerator {
    backend: Box<dyn LlmBackend>,
    style: ScriptStyle,
    min_length: usize,
    target_duration: f64,
}

impl ScriptGenerator {
    pub fn new(settings: &Settings) -> ShortgenResult<Self> {
        let google_key = non_empty_env("GOOGLE_API_KEY");
        let openai_key = non_empty_env("OPENAI_API_KEY");
        if google_key.is_none() && openai_key.is_none() {
            return Err(ShortgenError::Generation(
                "no LLM credentials found (GOOGLE_API_KEY or OPENAI_API_KEY)".into(),
            ));
        }

        let style = ScriptStyle::parse(&settings.script.style).ok_or_else(|| {
            ShortgenError::ConfigParse(format!(
                "unknown script style '{}' (expected one of: creative, analytical, emotional, humorous, expert, community)",
                settings.script.style
            ))
        })?;

        Ok(Self {
            backend: Box::new(HttpBackend {
                google_key,
                openai_key,
            }),
            style,
            min_length: settings.script.min_length,
            target_duration: settings.video.target_duration,
        })
    }

    #[cfg(test)]
    fn with_backend(backend: Box<dyn LlmBackend>, style: ScriptStyle, min_length: usize) -> Self {
        Self {
            backend,
            style,
            min_length,
            target_duration: 59.0,
        }
    }

    /// Generate a script for `topic`. A too-short result triggers exactly one
    /// regeneration; if the second draft is still short we keep it and warn
    /// rather than loop.
    pub fn generate(&self, topic: &str, source_text: &str) -> ShortgenResult<Script> {
        let script = self.generate_once(topic, source_text)?;
        if script.char_count() >= self.min_length {
            return Ok(script);
        }

        warn!(
            "script too short ({} chars < {}), regenerating once",
            script.char_count(),
            self.min_length
        );
        match self.generate_once(topic, source_text) {
            Ok(retried) if retried.char_count() >= self.min_length => Ok(retried),
            Ok(retried) => {
                warn!(
                    "regenerated script still short ({} chars), using it anyway",
                    retried.char_count()
                );
                Ok(retried)
            }
            Err(e) => {
                warn!("regeneration failed ({e}), keeping the short draft");
                Ok(script)
            }
        }
    }

    fn generate_once(&self, topic: &str, source_text: &str) -> ShortgenResult<Script> {
        let mut rng = rand::thread_rng();
        let prompt_text = if self.style == ScriptStyle::Community {
            prompt::build_community_prompt(topic, source_text, self.target_duration, &mut rng)
        } else {
            prompt::build_prompt(topic, self.style, self.target_duration, &mut rng)
        };

        let (raw, backend) = self.backend.complete(&prompt_text)?;
        info!("script draft received from {:?}", backend);

        let payload = parse_payload(&raw)?;
        payload_to_script(payload, topic, self.style)
    }
}

/// Gemini first, OpenAI on any Gemini failure. Each provider gets its own
/// transient-retry budget before we move on.
struct HttpBackend {
    google_key: Option<String>,
    openai_key: Option<String>,
}

impl LlmBackend for HttpBackend {
    fn complete(&self, prompt_text: &str) -> ShortgenResult<(String, Backend)> {
        let policy = RetryPolicy::default();

        if let Some(key) = &self.google_key {
            match with_retry("gemini", &policy, || call_gemini(prompt_text, key)) {
                Ok(text) => return Ok((text, Backend::Gemini)),
                Err(e) => {
                    if self.openai_key.is_none() {
                        return Err(e);
                    }
                    warn!("gemini failed ({e}), falling back to openai");
                }
            }
        }

        if let Some(key) = &self.openai_key {
            let text = with_retry("openai", &policy, || call_openai(prompt_text, key))?;
            return Ok((text, Backend::OpenAi));
        }

        Err(ShortgenError::Generation("no LLM backend available".into()))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

fn call_gemini(prompt_text: &str, api_key: &str) -> ShortgenResult<String> {
    let url = format!("{GEMINI_API_BASE}/{GEMINI_MODEL}:generateContent?key={api_key}");
    let body = serde_json::json!({
        "contents": [{"parts": [{"text": prompt_text}]}],
        "generationConfig": {"responseMimeType": "application/json"},
    });

    let response = ureq::post(&url)
        .header("Content-Type", "application/json")
        .send(body.to_string().as_bytes())
        .map_err(|e| provider_error("gemini", e))?;

    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| ShortgenError::Generation(format!("failed to read gemini response: {e}")))?;

    let parsed: GeminiResponse = serde_json::from_str(&text)
        .map_err(|e| ShortgenError::Generation(format!("unexpected gemini response: {e}")))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| ShortgenError::Generation("gemini returned no candidates".into()))
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

fn call_openai(prompt_text: &str, api_key: &str) -> ShortgenResult<String> {
    let body = serde_json::json!({
        "model": OPENAI_MODEL,
        "messages": [{"role": "user", "content": prompt_text}],
        "max_tokens": 6000,
        "response_format": {"type": "json_object"},
    });

    let response = ureq::post(OPENAI_CHAT_URL)
        .header("Authorization", &format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .send(body.to_string().as_bytes())
        .map_err(|e| provider_error("openai", e))?;

    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| ShortgenError::Generation(format!("failed to read openai response: {e}")))?;

    let parsed: OpenAiChatResponse = serde_json::from_str(&text)
        .map_err(|e| ShortgenError::Generation(format!("unexpected openai response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ShortgenError::Generation("openai returned no choices".into()))
}

/// The JSON shape the prompt asks the model to emit.
#[derive(Debug, Deserialize)]
struct ScriptPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    bg_theme: String,
    #[serde(default)]
    script: Vec<PayloadSentence>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    search_keywords: Vec<String>,
    #[serde(default)]
    hashtags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PayloadSentence {
    text: String,
    #[serde(default)]
    emotion: String,
}

/// Extract and parse the JSON payload from a raw model reply. Code fences are
/// stripped; a reply truncated mid-array gets its brackets closed before we
/// give up.
fn parse_payload(raw: &str) -> ShortgenResult<ScriptPayload> {
    let text = strip_code_fences(raw).trim().to_string();

    if let Ok(payload) = serde_json::from_str::<ScriptPayload>(&text) {
        return Ok(payload);
    }

    // truncated output: cut at the last comma, close open brackets
    if let Some(last_comma) = text.rfind(',') {
        let mut repaired = text[..last_comma].to_string();
        let open_brackets = repaired.matches('[').count() as i64 - repaired.matches(']').count() as i64;
        let open_braces = repaired.matches('{').count() as i64 - repaired.matches('}').count() as i64;
        for _ in 0..open_brackets.max(0) {
            repaired.push(']');
        }
        for _ in 0..open_braces.max(0) {
            repaired.push('}');
        }
        if let Ok(payload) = serde_json::from_str::<ScriptPayload>(&repaired) {
            return Ok(payload);
        }
    }

    // last resort: widest brace span
    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if last > first {
            if let Ok(payload) = serde_json::from_str::<ScriptPayload>(&text[first..=last]) {
                return Ok(payload);
            }
        }
    }

    Err(ShortgenError::ScriptParse(format!(
        "model reply is not valid JSON: {}",
        text.chars().take(120).collect::<String>()
    )))
}

fn strip_code_fences(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let inner = &raw[start + 7..];
        return inner.split("```").next().unwrap_or(inner);
    }
    if let Some(start) = raw.find("```") {
        let inner = &raw[start + 3..];
        return inner.split("```").next().unwrap_or(inner);
    }
    raw
}

const KNOWN_THEMES: [&str; 5] = ["horror", "funny", "touching", "shocking", "mystery"];

fn payload_to_script(
    payload: ScriptPayload,
    topic: &str,
    style: ScriptStyle,
) -> ShortgenResult<Script> {
    let sentences: Vec<Sentence> = payload
        .script
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| Sentence {
            text: clean_sentence(&s.text),
            emotion: EmotionTag::parse_lenient(&s.emotion),
        })
        .collect();

    if sentences.is_empty() {
        return Err(ShortgenError::ScriptParse(
            "payload contains no script sentences".into(),
        ));
    }

    let title = if payload.title.trim().is_empty() {
        topic.chars().take(60).collect()
    } else {
        payload.title.trim().to_string()
    };

    let theme = payload.bg_theme.trim().to_lowercase();
    let theme = if KNOWN_THEMES.contains(&theme.as_str()) {
        theme
    } else {
        "mystery".to_string()
    };

    let mut search_keywords = payload.search_keywords;
    search_keywords.retain(|k| !k.trim().is_empty());
    if search_keywords.len() < 3 {
        // fallback footage queries keyed off the theme
        search_keywords = default_search_keywords(&theme);
    }

    Ok(Script {
        title,
        sentences,
        style,
        theme,
        keywords: payload.keywords,
        search_keywords,
        hashtags: payload.hashtags,
    })
}

/// Strip markdown bold and stage directions the model sometimes emits despite
/// being told not to. The narration must be plain speakable text.
fn clean_sentence(text: &str) -> String {
    text.replace("**", "").replace('*', "").trim().to_string()
}

fn default_search_keywords(theme: &str) -> Vec<String> {
    let queries: [&str; 4] = match theme {
        "horror" => [
            "dark scary hallway",
            "abandoned building night",
            "foggy forest path",
            "shadowy figure silhouette",
        ],
        "funny" => [
            "people laughing together",
            "funny pet moment",
            "comedic fail outdoors",
            "friends joking cafe",
        ],
        "touching" => [
            "emotional embrace reunion",
            "sunset hands holding",
            "family dinner warm",
            "tears of joy closeup",
        ],
        "shocking" => [
            "person shocked surprised face",
            "dramatic lightning storm",
            "breaking news screen",
            "crowd reacting street",
        ],
        _ => [
            "dark mysterious corridor",
            "detective evidence board",
            "old mysterious book",
            "city night rain",
        ],
    };
    queries.iter().map(|s| s.to_string()).collect()
}
