use crate::error::{ShortgenError, ShortgenResult};
use crate::tts::elevenlabs::mp3_to_wav;
use crate::tts::{ffprobe_duration, SynthesisResult, TtsEngine};
use std::path::Path;
use std::process::Command;

/// Free backstop engine: Microsoft Edge neural TTS via the `edge-tts` Python
/// CLI. Requires `pip install edge-tts` and internet access, but no API key,
/// so the chain always has somewhere to land.
pub struct EdgeTtsEngine;

const DEFAULT_VOICE: &str = "en-US-GuyNeural";

impl EdgeTtsEngine {
    /// Create the engine, verifying `edge-tts` is on PATH.
    pub fn new() -> ShortgenResult<Self> {
        let check = Command::new("which")
            .arg("edge-tts")
            .output()
            .map_err(|e| ShortgenError::Tts(format!("Failed to check for 'edge-tts': {e}")))?;

        if !check.status.success() {
            return Err(ShortgenError::Tts(
                "edge-tts not found. Install with: pip install edge-tts".into(),
            ));
        }

        Ok(Self)
    }
}

/// Convert a speed multiplier to an edge-tts `--rate` string.
///
/// `1.0` → `"+0%"`, `1.2` → `"+20%"`, `0.8` → `"-20%"`.
fn speed_to_rate(speed: f32) -> String {
    let pct = ((speed - 1.0) * 100.0).round() as i32;
    if pct >= 0 {
        format!("+{pct}%")
    } else {
        format!("{pct}%")
    }
}

impl TtsEngine for EdgeTtsEngine {
    fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
    ) -> ShortgenResult<SynthesisResult> {
        let voice = voice.unwrap_or(DEFAULT_VOICE);
        let rate = speed_to_rate(speed);

        // edge-tts outputs MP3; write to a temp file then convert to WAV
        let mp3_path = output_path.with_extension("mp3");

        let output = Command::new("edge-tts")
            .args(["--voice", voice])
            .args(["--rate", &rate])
            .args(["--text", text])
            .arg("--write-media")
            .arg(&mp3_path)
            .output()
            .map_err(|e| ShortgenError::Tts(format!("Failed to run 'edge-tts': {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShortgenError::Tts(format!("'edge-tts' failed: {stderr}")));
        }

        // rate flag already applied the speed
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
        "edge"
    }
}
