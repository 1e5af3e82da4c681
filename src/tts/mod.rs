pub mod cache;
pub mod chain;
pub mod edge;
pub mod elevenlabs;
pub mod openai;
pub mod timestamps;

use crate::config::TtsConfig;
use crate::error::{ShortgenError, ShortgenResult};
use chain::FallbackChain;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of a single TTS synthesis call. `word_timestamps` holds
/// provider-reported timings when the backend returns them; `None` means the
/// caller estimates from the text.
#[derive(Debug)]
pub struct SynthesisResult {
    pub audio_path: PathBuf,
    pub duration_secs: f64,
    pub cached: bool,
    pub word_timestamps: Option<Vec<timestamps::WordTimestamp>>,
}

/// Finished narration for one script: audio plus word timings, native or
/// estimated, which the subtitle stage consumes.
#[derive(Debug)]
pub struct NarrationTrack {
    pub audio_path: PathBuf,
    pub duration_secs: f64,
    pub words: Vec<timestamps::WordTimestamp>,
    pub engine: String,
    pub cached: bool,
}

/// Trait for pluggable TTS backends.
///
/// Implementations are synchronous; provider calls are blocking but bounded,
/// and narration runs before any video work so nothing is starved.
pub trait TtsEngine: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
    ) -> ShortgenResult<SynthesisResult>;

    fn engine_name(&self) -> &'static str;
}

/// Build the provider chain from config.
///
/// `enhanced` stacks every provider whose credentials/tools are present, best
/// voice first. `legacy` is the free engine alone. A single engine name pins
/// that engine and fails fast when it can't be constructed.
pub fn create_chain(config: &TtsConfig) -> ShortgenResult<FallbackChain> {
    match config.engine.as_str() {
        "enhanced" => {
            let mut engines: Vec<Box<dyn TtsEngine>> = Vec::new();
            if let Ok(engine) = elevenlabs::ElevenLabsEngine::new() {
                engines.push(Box::new(engine));
            }
            if let Ok(engine) = openai::OpenAiTtsEngine::new() {
                engines.push(Box::new(engine));
            }
            if let Ok(engine) = edge::EdgeTtsEngine::new() {
                engines.push(Box::new(engine));
            }
            if engines.is_empty() {
                return Err(ShortgenError::Tts(
                    "no TTS provider available for the enhanced chain".into(),
                ));
            }
            Ok(FallbackChain::new(engines))
        }
        "legacy" | "edge" => Ok(FallbackChain::new(vec![Box::new(
            edge::EdgeTtsEngine::new()?,
        )])),
        "elevenlabs" => Ok(FallbackChain::new(vec![Box::new(
            elevenlabs::ElevenLabsEngine::new()?,
        )])),
        "openai" => Ok(FallbackChain::new(vec![Box::new(
            openai::OpenAiTtsEngine::new()?,
        )])),
        other => Err(ShortgenError::Tts(format!(
            "Unknown TTS engine: '{other}'. Supported: enhanced, legacy, edge, elevenlabs, openai"
        ))),
    }
}

/// Query audio duration via ffprobe. Returns seconds.
pub fn ffprobe_duration(path: &Path) -> ShortgenResult<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path.as_os_str())
        .output()
        .map_err(|e| ShortgenError::Tts(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShortgenError::Tts(format!("ffprobe failed: {stderr}")));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|e| ShortgenError::Tts(format!("Failed to parse ffprobe duration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(engine: &str) -> TtsConfig {
        TtsConfig {
            engine: engine.into(),
            voice: None,
            speed: 1.0,
            cache_enabled: true,
        }
    }

    #[test]
    fn test_create_chain_unknown_engine() {
        let result = create_chain(&config_for("nonexistent"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("nonexistent"));
    }

    #[test]
    fn test_create_chain_elevenlabs_no_key() {
        let prev = std::env::var("ELEVEN_API_KEY").ok();
        std::env::remove_var("ELEVEN_API_KEY");

        let result = create_chain(&config_for("elevenlabs"));
        assert!(result.is_err());

        if let Some(val) = prev {
            std::env::set_var("ELEVEN_API_KEY", val);
        }
    }
}
