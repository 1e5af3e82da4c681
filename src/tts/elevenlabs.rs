use crate::error::{provider_error, ShortgenError, ShortgenResult};
use crate::tts::{ffprobe_duration, SynthesisResult, TtsEngine};
use std::path::Path;
use std::process::Command;

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB"; // Adam
const MODEL_ID: &str = "eleven_multilingual_v2";

// Expressive settings tuned for storytelling narration: low stability lets
// the voice actually emote, style pushes delivery away from newsreader flat.
const STABILITY: f32 = 0.35;
const SIMILARITY_BOOST: f32 = 0.85;
const STYLE: f32 = 0.3;

/// Premium narration via the ElevenLabs REST API
/// (`POST /v1/text-to-speech/{voice_id}`).
///
/// Requires the `ELEVEN_API_KEY` environment variable.
#[derive(Debug)]
pub struct ElevenLabsEngine {
    api_key: String,
}

impl ElevenLabsEngine {
    pub fn new() -> ShortgenResult<Self> {
        let api_key = std::env::var("ELEVEN_API_KEY").map_err(|_| {
            ShortgenError::Tts(
                "ELEVEN_API_KEY env var not set. Get your API key from https://elevenlabs.io"
                    .into(),
            )
        })?;

        if api_key.is_empty() {
            return Err(ShortgenError::Tts("ELEVEN_API_KEY env var is empty".into()));
        }

        Ok(Self { api_key })
    }
}

impl TtsEngine for ElevenLabsEngine {
    fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
    ) -> ShortgenResult<SynthesisResult> {
        let voice_id = voice.unwrap_or(DEFAULT_VOICE_ID);
        let url = format!("{API_BASE}/text-to-speech/{voice_id}?output_format=mp3_44100_128");

        let body = serde_json::json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": {
                "stability": STABILITY,
                "similarity_boost": SIMILARITY_BOOST,
                "style": STYLE,
            },
        });

        let response = ureq::post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| provider_error("elevenlabs", e))?;

        let bytes = response
            .into_body()
            .read_to_vec()
            .map_err(|e| ShortgenError::Tts(format!("Failed to read ElevenLabs response: {e}")))?;

        // Write MP3 to temp file, then convert to WAV
        let mp3_path = output_path.with_extension("mp3");
        std::fs::write(&mp3_path, &bytes)
            .map_err(|e| ShortgenError::Tts(format!("Failed to write MP3: {e}")))?;

        mp3_to_wav(&mp3_path, output_path, speed)?;
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
        "elevenlabs"
    }
}

/// MP3 → 22.05 kHz WAV, applying an atempo filter for non-unit speed.
pub(crate) fn mp3_to_wav(mp3_path: &Path, wav_path: &Path, speed: f32) -> ShortgenResult<()> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), mp3_path.display().to_string()];

    if (speed - 1.0).abs() > 0.01 {
        let clamped = speed.clamp(0.5, 100.0);
        args.extend(["-af".into(), format!("atempo={clamped}")]);
    }

    args.extend([
        "-acodec".into(),
        "pcm_s16le".into(),
        "-ar".into(),
        "22050".into(),
        wav_path.display().to_string(),
    ]);

    let output = Command::new("ffmpeg")
        .args(&args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .output()
        .map_err(|e| ShortgenError::Tts(format!("Failed to convert MP3 to WAV: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShortgenError::Tts(format!(
            "FFmpeg MP3 to WAV conversion failed: {stderr}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_missing_env_var() {
        let prev = std::env::var("ELEVEN_API_KEY").ok();
        std::env::remove_var("ELEVEN_API_KEY");

        let result = ElevenLabsEngine::new();
        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(
            err_msg.contains("ELEVEN_API_KEY"),
            "Error should mention ELEVEN_API_KEY, got: {err_msg}"
        );

        if let Some(val) = prev {
            std::env::set_var("ELEVEN_API_KEY", val);
        }
    }

    #[test]
    fn test_new_empty_env_var() {
        let prev = std::env::var("ELEVEN_API_KEY").ok();
        std::env::set_var("ELEVEN_API_KEY", "");

        assert!(ElevenLabsEngine::new().is_err());

        match prev {
            Some(val) => std::env::set_var("ELEVEN_API_KEY", val),
            None => std::env::remove_var("ELEVEN_API_KEY"),
        }
    }
}
