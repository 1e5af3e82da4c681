use crate::error::{provider_error, ShortgenError, ShortgenResult};
use crate::tts::elevenlabs::mp3_to_wav;
use crate::tts::{ffprobe_duration, SynthesisResult, TtsEngine};
use std::path::Path;

const API_URL: &str = "https://api.openai.com/v1/audio/speech";
const MODEL: &str = "tts-1-hd";
const DEFAULT_VOICE: &str = "onyx";
const VOICES: [&str; 6] = ["onyx", "nova", "shimmer", "alloy", "echo", "fable"];

/// Mid-tier narration via the OpenAI speech API (`POST /v1/audio/speech`).
///
/// Requires the `OPENAI_API_KEY` environment variable. Speed is passed to the
/// API directly rather than post-processed, so the voice keeps its pitch.
#[derive(Debug)]
pub struct OpenAiTtsEngine {
    api_key: String,
}

impl OpenAiTtsEngine {
    pub fn new() -> ShortgenResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ShortgenError::Tts("OPENAI_API_KEY env var not set".into())
        })?;

        if api_key.is_empty() {
            return Err(ShortgenError::Tts("OPENAI_API_KEY env var is empty".into()));
        }

        Ok(Self { api_key })
    }
}

impl TtsEngine for OpenAiTtsEngine {
    fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
    ) -> ShortgenResult<SynthesisResult> {
        let voice = normalize_voice(voice);
        let speed = speed.clamp(0.25, 4.0);

        let body = serde_json::json!({
            "model": MODEL,
            "input": text,
            "voice": voice,
            "speed": speed,
            "response_format": "mp3",
        });

        let response = ureq::post(API_URL)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| provider_error("openai", e))?;

        let bytes = response
            .into_body()
            .read_to_vec()
            .map_err(|e| ShortgenError::Tts(format!("Failed to read OpenAI TTS response: {e}")))?;

        let mp3_path = output_path.with_extension("mp3");
        std::fs::write(&mp3_path, &bytes)
            .map_err(|e| ShortgenError::Tts(format!("Failed to write MP3: {e}")))?;

        // speed already applied by the API
        mp3_to_wav(&mp3_path, output_path, 1.0)?;
        let _ = std::fs::remove_file(&mp3_path);

        let duration_secs = ffprobe_duration(output_path)?;

        Ok(SynthesisResult {
            audio_path: output_path.to_path_buf(),
            duration_secs,
            cached: false,
            word_timestamps: None,
        })
    }

    fn engine_name(&self) -> &'static str {
        "openai"
    }
}

/// Unknown voice names fall back to the default instead of failing the call.
fn normalize_voice(voice: Option<&str>) -> &str {
    match voice {
        Some(v) if VOICES.contains(&v) => v,
        _ => DEFAULT_VOICE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_voice() {
        assert_eq!(normalize_voice(Some("nova")), "nova");
        assert_eq!(normalize_voice(Some("onyx")), "onyx");
        assert_eq!(normalize_voice(Some("en-US-AriaNeural")), "onyx");
        assert_eq!(normalize_voice(None), "onyx");
    }

    #[test]
    fn test_new_missing_env_var() {
        let prev = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        assert!(OpenAiTtsEngine::new().is_err());

        if let Some(val) = prev {
            std::env::set_var("OPENAI_API_KEY", val);
        }
    }
}
