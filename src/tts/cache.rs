//! On-disk synthesis cache.
//!
//! Keyed by SHA-256 over everything that shapes the audio: engine, voice,
//! speed, text. Each entry is a WAV next to a JSON record holding the
//! duration and, when the provider reported them, the native word timings,
//! so a cache hit loses nothing a fresh synthesis would have had.

use crate::error::ShortgenResult;
use crate::tts::timestamps::WordTimestamp;
use crate::tts::{SynthesisResult, TtsEngine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    duration_secs: f64,
    engine: String,
    voice: String,
    text_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    word_timestamps: Option<Vec<WordTimestamp>>,
}

pub struct TtsCache {
    dir: PathBuf,
}

impl TtsCache {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join("tts"),
        }
    }

    /// Serve from cache when possible, otherwise synthesize and remember the
    /// result. The audio always lands at `output_path` either way.
    pub fn fetch_or_synthesize(
        &self,
        engine: &dyn TtsEngine,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
    ) -> ShortgenResult<SynthesisResult> {
        let key = entry_key(engine.engine_name(), voice, speed, text);

        if let Some(hit) = self.lookup(&key, output_path)? {
            debug!("tts cache hit for {}", engine.engine_name());
            return Ok(hit);
        }

        let result = engine.synthesize(text, voice, speed, output_path)?;
        self.store(&key, &result, engine.engine_name(), voice, text)?;
        Ok(result)
    }

    /// A hit needs both the audio and a readable record; anything less is
    /// treated as a miss.
    fn lookup(&self, key: &str, output_path: &Path) -> ShortgenResult<Option<SynthesisResult>> {
        let wav = self.dir.join(format!("{key}.wav"));
        let record_path = self.dir.join(format!("{key}.json"));
        if !wav.exists() {
            return Ok(None);
        }

        let record = match read_record(&record_path) {
            Some(r) => r,
            None => return Ok(None),
        };

        std::fs::copy(&wav, output_path)?;
        Ok(Some(SynthesisResult {
            audio_path: output_path.to_path_buf(),
            duration_secs: record.duration_secs,
            cached: true,
            word_timestamps: record.word_timestamps,
        }))
    }

    fn store(
        &self,
        key: &str,
        result: &SynthesisResult,
        engine_name: &str,
        voice: Option<&str>,
        text: &str,
    ) -> ShortgenResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::copy(&result.audio_path, self.dir.join(format!("{key}.wav")))?;

        let record = CacheRecord {
            duration_secs: result.duration_secs,
            engine: engine_name.to_string(),
            voice: voice.unwrap_or_default().to_string(),
            text_preview: text.chars().take(80).collect(),
            word_timestamps: result.word_timestamps.clone(),
        };
        if let Ok(json) = serde_json::to_string_pretty(&record) {
            let _ = std::fs::write(self.dir.join(format!("{key}.json")), json);
        }
        Ok(())
    }
}

/// Deterministic cache key over all the inputs that affect audio content.
fn entry_key(engine_name: &str, voice: Option<&str>, speed: f32, text: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [engine_name, voice.unwrap_or(""), &speed.to_string(), text] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

/// Returns `None` on any read or parse failure; a bad record is a cache miss.
fn read_record(path: &Path) -> Option<CacheRecord> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShortgenError;

    struct CountingEngine {
        calls: std::sync::atomic::AtomicUsize,
        native: bool,
    }

    impl TtsEngine for CountingEngine {
        fn synthesize(
            &self,
            _text: &str,
            _voice: Option<&str>,
            _speed: f32,
            output_path: &Path,
        ) -> ShortgenResult<SynthesisResult> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            std::fs::write(output_path, b"wav bytes")?;
            Ok(SynthesisResult {
                audio_path: output_path.to_path_buf(),
                duration_secs: 2.5,
                cached: false,
                word_timestamps: self.native.then(|| {
                    vec![WordTimestamp {
                        word: "hello".into(),
                        start_secs: 0.0,
                        end_secs: 2.5,
                    }]
                }),
            })
        }

        fn engine_name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting(native: bool) -> CountingEngine {
        CountingEngine {
            calls: std::sync::atomic::AtomicUsize::new(0),
            native,
        }
    }

    #[test]
    fn test_entry_key_deterministic_and_distinct() {
        let a = entry_key("elevenlabs", Some("Adam"), 1.0, "Hello world");
        assert_eq!(a, entry_key("elevenlabs", Some("Adam"), 1.0, "Hello world"));
        assert_eq!(a.len(), 64);

        assert_ne!(a, entry_key("edge", Some("Adam"), 1.0, "Hello world"));
        assert_ne!(a, entry_key("elevenlabs", None, 1.0, "Hello world"));
        assert_ne!(a, entry_key("elevenlabs", Some("Adam"), 1.5, "Hello world"));
        assert_ne!(a, entry_key("elevenlabs", Some("Adam"), 1.0, "Goodbye"));
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TtsCache::new(dir.path());
        let engine = counting(false);

        let first = cache
            .fetch_or_synthesize(&engine, "hi there", None, 1.0, &dir.path().join("a.wav"))
            .unwrap();
        assert!(!first.cached);

        let second = cache
            .fetch_or_synthesize(&engine, "hi there", None, 1.0, &dir.path().join("b.wav"))
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.duration_secs, 2.5);
        assert!(dir.path().join("b.wav").exists());
        assert_eq!(engine.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hit_restores_native_word_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TtsCache::new(dir.path());
        let engine = counting(true);

        cache
            .fetch_or_synthesize(&engine, "hello", None, 1.0, &dir.path().join("a.wav"))
            .unwrap();
        let hit = cache
            .fetch_or_synthesize(&engine, "hello", None, 1.0, &dir.path().join("b.wav"))
            .unwrap();

        let words = hit.word_timestamps.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "hello");
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TtsCache::new(dir.path());
        let engine = counting(false);

        cache
            .fetch_or_synthesize(&engine, "hi", None, 1.0, &dir.path().join("a.wav"))
            .unwrap();
        let key = entry_key("counting", None, 1.0, "hi");
        std::fs::write(dir.path().join("tts").join(format!("{key}.json")), "not json").unwrap();

        let again = cache
            .fetch_or_synthesize(&engine, "hi", None, 1.0, &dir.path().join("b.wav"))
            .unwrap();
        assert!(!again.cached);
        assert_eq!(engine.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
