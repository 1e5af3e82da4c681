use crate::error::{ShortgenError, ShortgenResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process-wide settings, loaded once at startup and immutable for the run.
///
/// All sections are optional in `shortgen.toml`; missing keys fall back to the
/// defaults below. API credentials are never stored here — providers read them
/// from the environment at construction time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Project root all relative paths resolve against. Not read from TOML;
    /// set by `load_settings`.
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Scopes the temp directory so concurrent runs never share partial
    /// files. Empty for single runs; batch workers set a unique tag.
    #[serde(skip)]
    pub run_tag: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Cap on the final video length in seconds (Shorts limit).
    #[serde(default = "default_target_duration")]
    pub target_duration: f64,
    /// Crossfade between background clips; 0.0 means hard cuts.
    #[serde(default)]
    pub crossfade_duration: f64,
    /// Seconds each background clip stays on screen before cutting.
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptConfig {
    #[serde(default = "default_style")]
    pub style: String,
    /// Narration shorter than this triggers one regeneration attempt.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Attempt ceiling for the generation <-> gate loop.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Abort when the gate loop is exhausted instead of accepting the
    /// best-scoring draft.
    #[serde(default)]
    pub strict: bool,
    /// Run the slower AI quality judge in addition to the rule check.
    #[serde(default)]
    pub quality_ai: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Story communities polled for source posts, tried in order.
    #[serde(default = "default_communities")]
    pub communities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsConfig {
    /// "enhanced" = ElevenLabs -> OpenAI -> edge-tts; "legacy" = edge-tts only.
    #[serde(default = "default_tts_engine")]
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "default_voice_speed")]
    pub speed: f32,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackgroundConfig {
    /// Query the stock footage service before falling back to generated clips.
    #[serde(default = "default_true")]
    pub use_stock: bool,
    #[serde(default = "default_clip_count")]
    pub clip_count: usize,
    /// Minimum acceptable width for downloaded stock clips.
    #[serde(default = "default_min_clip_width")]
    pub min_clip_width: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MusicConfig {
    /// Directory scanned for background music; empty disables music.
    #[serde(default)]
    pub directory: String,
    /// Steady-state music level relative to full volume.
    #[serde(default = "default_music_volume")]
    pub volume: f64,
    #[serde(default = "default_true")]
    pub ducking: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_max_words")]
    pub max_words_per_subtitle: usize,
}

fn default_fps() -> u32 {
    30
}
fn default_width() -> u32 {
    1080
}
fn default_height() -> u32 {
    1920
}
fn default_target_duration() -> f64 {
    59.0
}
fn default_segment_seconds() -> f64 {
    5.0
}
fn default_style() -> String {
    "community".into()
}
fn default_min_length() -> usize {
    200
}
fn default_max_attempts() -> u32 {
    3
}
fn default_communities() -> Vec<String> {
    ["tifu", "MaliciousCompliance", "AmItheAsshole"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_tts_engine() -> String {
    "enhanced".into()
}
fn default_voice_speed() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_clip_count() -> usize {
    8
}
fn default_min_clip_width() -> u32 {
    1080
}
fn default_music_volume() -> f64 {
    0.25
}
fn default_output_dir() -> String {
    "./output".into()
}
fn default_quality() -> String {
    "standard".into()
}
fn default_max_words() -> usize {
    4
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            target_duration: default_target_duration(),
            crossfade_duration: 0.0,
            segment_seconds: default_segment_seconds(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            min_length: default_min_length(),
            max_attempts: default_max_attempts(),
            strict: false,
            quality_ai: false,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            communities: default_communities(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: default_tts_engine(),
            voice: None,
            speed: default_voice_speed(),
            cache_enabled: true,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            use_stock: true,
            clip_count: default_clip_count(),
            min_clip_width: default_min_clip_width(),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            volume: default_music_volume(),
            ducking: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            quality: default_quality(),
            max_words_per_subtitle: default_max_words(),
        }
    }
}

impl Settings {
    pub fn output_dir(&self) -> PathBuf {
        let rel = self
            .output
            .directory
            .strip_prefix("./")
            .unwrap_or(&self.output.directory);
        self.project_dir.join(rel)
    }

    pub fn temp_dir(&self) -> PathBuf {
        let base = self.project_dir.join("temp");
        if self.run_tag.is_empty() {
            base
        } else {
            base.join(&self.run_tag)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.project_dir.join("data")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }

    pub fn history_file(&self) -> PathBuf {
        self.data_dir().join("history.json")
    }

    pub fn used_posts_file(&self) -> PathBuf {
        self.data_dir().join("used_posts.json")
    }

    pub fn music_dir(&self) -> Option<PathBuf> {
        if self.music.directory.is_empty() {
            None
        } else {
            Some(self.project_dir.join(&self.music.directory))
        }
    }
}

/// Load settings from `<project>/shortgen.toml`, or defaults when the file is
/// absent. A present-but-invalid file is an error, never silently ignored.
pub fn load_settings(project_dir: &Path) -> ShortgenResult<Settings> {
    let config_path = project_dir.join("shortgen.toml");

    let mut settings: Settings = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)?;
        toml::from_str(&contents).map_err(|e| ShortgenError::ConfigParse(e.to_string()))?
    } else {
        Settings::default()
    };

    settings.project_dir = project_dir.to_path_buf();
    Ok(settings)
}

/// Encoding parameters mapped from the quality string.
pub struct QualityPreset {
    pub crf: u32,
    pub preset: &'static str,
    pub audio_bitrate: &'static str,
    pub audio_samplerate: u32,
}

impl QualityPreset {
    pub fn from_name(name: &str) -> Self {
        match name {
            "draft" => Self {
                crf: 28,
                preset: "ultrafast",
                audio_bitrate: "96k",
                audio_samplerate: 44100,
            },
            "high" => Self {
                crf: 18,
                preset: "slow",
                audio_bitrate: "256k",
                audio_samplerate: 48000,
            },
            _ => Self {
                crf: 23,
                preset: "medium",
                audio_bitrate: "128k",
                audio_samplerate: 44100,
            }, // standard
        }
    }
}
