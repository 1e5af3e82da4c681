//! Priority-ordered provider fallback.
//!
//! The chain tries each engine in order. A failing engine is marked
//! unavailable and skipped for the rest of the process, with a single warning
//! the first time, so a dead provider doesn't add latency to every call.

use crate::error::{ShortgenError, ShortgenResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::tts::{cache, timestamps, NarrationTrack, TtsEngine};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

pub struct FallbackChain {
    engines: Vec<Box<dyn TtsEngine>>,
    unavailable: Mutex<HashSet<usize>>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("engines", &self.engine_names())
            .finish()
    }
}

impl FallbackChain {
    pub fn new(engines: Vec<Box<dyn TtsEngine>>) -> Self {
        Self {
            engines,
            unavailable: Mutex::new(HashSet::new()),
            policy: RetryPolicy::default(),
        }
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.engine_name()).collect()
    }

    /// Narrate `text` into `output_path` using the first engine that works.
    ///
    /// The audio uses a cleaned version of the text. Word timings come from
    /// the provider when it reports them, otherwise they are estimated from
    /// the original text so subtitles match what the viewer reads. With
    /// `cache_root` set, synthesis goes through the on-disk cache.
    pub fn narrate(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        output_path: &Path,
        cache_root: Option<&Path>,
    ) -> ShortgenResult<NarrationTrack> {
        let tts_text = timestamps::preprocess_for_tts(text);
        let cache = cache_root.map(cache::TtsCache::new);
        let mut last_err: Option<ShortgenError> = None;

        for (index, engine) in self.engines.iter().enumerate() {
            if self.is_unavailable(index) {
                continue;
            }

            let name = engine.engine_name();
            let attempt = with_retry(name, &self.policy, || match &cache {
                Some(cache) => {
                    cache.fetch_or_synthesize(engine.as_ref(), &tts_text, voice, speed, output_path)
                }
                None => engine.synthesize(&tts_text, voice, speed, output_path),
            });

            match attempt {
                Ok(result) => {
                    info!(
                        "narration via {} ({:.1}s{})",
                        name,
                        result.duration_secs,
                        if result.cached { ", cached" } else { "" }
                    );
                    let words = match result.word_timestamps {
                        Some(native) if !native.is_empty() => native,
                        _ => timestamps::estimate_word_timestamps(text, result.duration_secs),
                    };
                    return Ok(NarrationTrack {
                        audio_path: result.audio_path,
                        duration_secs: result.duration_secs,
                        words,
                        engine: name.to_string(),
                        cached: result.cached,
                    });
                }
                Err(e) => {
                    warn!("TTS engine {name} unavailable, falling back: {e}");
                    self.mark_unavailable(index);
                    last_err = Some(e);
                }
            }
        }

        Err(ShortgenError::Tts(format!(
            "all TTS engines failed ({}){}",
            self.engine_names().join(", "),
            last_err
                .map(|e| format!("; last error: {e}"))
                .unwrap_or_default()
        )))
    }

    fn is_unavailable(&self, index: usize) -> bool {
        self.unavailable
            .lock()
            .map(|set| set.contains(&index))
            .unwrap_or(false)
    }

    fn mark_unavailable(&self, index: usize) {
        if let Ok(mut set) = self.unavailable.lock() {
            set.insert(index);
        }
    }
}
