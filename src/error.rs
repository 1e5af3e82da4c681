use std::path::PathBuf;
use thiserror::Error;

/// How a provider call failed, for retry/fallback decisions.
///
/// Transient failures (rate limits, timeouts, 5xx, transport errors) are
/// retried with backoff before falling back to the next provider. Permanent
/// failures (bad credentials, malformed requests) skip straight to the next
/// provider without the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

#[derive(Error, Debug)]
pub enum ShortgenError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Script generation failed: {0}")]
    Generation(String),

    #[error("Failed to parse script payload: {0}")]
    ScriptParse(String),

    #[error("Script rejected by quality gate (score {score} < {threshold})")]
    QualityRejected { score: u8, threshold: u8 },

    #[error("Script rejected by originality gate (similarity {similarity:.2} to '{similar_title}')")]
    OriginalityRejected {
        similarity: f64,
        similar_title: String,
    },

    #[error("{provider} provider error: {message}")]
    Provider {
        provider: String,
        kind: FailureKind,
        message: String,
    },

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Background error: {0}")]
    Background(String),

    #[error("Crawl error: {0}")]
    Crawl(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Required stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        source: Box<ShortgenError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ShortgenError {
    /// Return an actionable hint for the user, if applicable.
    pub fn hint(&self) -> Option<String> {
        match self {
            ShortgenError::ConfigNotFound(_) => Some(
                "Pass --project pointing at a directory with a shortgen.toml, or omit it to use defaults.".into(),
            ),
            ShortgenError::ConfigParse(_) => Some(
                "Check shortgen.toml syntax. All sections are optional; keys must match the documented names.".into(),
            ),
            ShortgenError::Generation(_) => Some(
                "Set GOOGLE_API_KEY (Gemini) or OPENAI_API_KEY in the environment or a .env file.".into(),
            ),
            ShortgenError::Tts(_) => Some(
                "Ensure at least one TTS provider is available: set ELEVEN_API_KEY or \
                 OPENAI_API_KEY, or install the free fallback with: pip install edge-tts"
                    .into(),
            ),
            ShortgenError::Background(_) => Some(
                "Set PEXELS_API_KEY for stock footage, or pass --no-stock to use generated backgrounds.".into(),
            ),
            ShortgenError::Ffmpeg(_) => Some(
                "Ensure FFmpeg is installed and on your PATH. Install via: brew install ffmpeg (macOS) or apt install ffmpeg (Linux).".into(),
            ),
            ShortgenError::QualityRejected { .. } | ShortgenError::OriginalityRejected { .. } => Some(
                "Run without --strict to accept the best-scoring draft after the retry budget is spent.".into(),
            ),
            ShortgenError::Stage { source, .. } => source.hint(),
            _ => None,
        }
    }

    /// Classification used by retry loops. Only explicit provider errors carry
    /// a kind; everything else is treated as permanent (no blind retries).
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ShortgenError::Provider { kind, .. } => *kind,
            _ => FailureKind::Permanent,
        }
    }
}

/// Map an HTTP status code to a failure kind.
pub fn classify_status(code: u16) -> FailureKind {
    match code {
        408 | 429 => FailureKind::Transient,
        500..=599 => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

/// Map a ureq error into a provider error with the right failure kind.
/// Transport-level failures (DNS, connect, timeout) count as transient.
pub fn provider_error(provider: &str, err: ureq::Error) -> ShortgenError {
    let kind = match &err {
        ureq::Error::StatusCode(code) => classify_status(*code),
        _ => FailureKind::Transient,
    };
    ShortgenError::Provider {
        provider: provider.to_string(),
        kind,
        message: err.to_string(),
    }
}

pub type ShortgenResult<T> = Result<T, ShortgenError>;
