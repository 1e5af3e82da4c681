//! Pexels stock video search and download.

use crate::error::{provider_error, ShortgenError, ShortgenResult};
use crate::retry::{with_retry, RetryPolicy};
use serde::Deserialize;
use std::path::Path;

const SEARCH_URL: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
pub struct PexelsVideo {
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
pub struct VideoFile {
    pub link: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub width: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

pub struct PexelsClient {
    api_key: String,
    policy: RetryPolicy,
}

impl PexelsClient {
    pub fn from_env() -> Option<Self> {
        std::env::var("PEXELS_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|api_key| Self {
                api_key,
                policy: RetryPolicy::default(),
            })
    }

    /// Search portrait-orientation videos for `query`.
    pub fn search(&self, query: &str, per_page: usize) -> ShortgenResult<Vec<PexelsVideo>> {
        let url = format!(
            "{SEARCH_URL}?query={}&per_page={per_page}&orientation=portrait&size=medium",
            urlencode(query)
        );

        with_retry("pexels search", &self.policy, || {
            let response = ureq::get(&url)
                .header("Authorization", &self.api_key)
                .call()
                .map_err(|e| provider_error("pexels", e))?;

            let text = response.into_body().read_to_string().map_err(|e| {
                ShortgenError::Background(format!("failed to read pexels response: {e}"))
            })?;

            let parsed: SearchResponse = serde_json::from_str(&text).map_err(|e| {
                ShortgenError::Background(format!("unexpected pexels response: {e}"))
            })?;

            Ok(parsed.videos)
        })
    }

    pub fn download(&self, url: &str, dest: &Path) -> ShortgenResult<()> {
        with_retry("pexels download", &self.policy, || {
            let response = ureq::get(url)
                .call()
                .map_err(|e| provider_error("pexels", e))?;

            let bytes = response.into_body().read_to_vec().map_err(|e| {
                ShortgenError::Background(format!("failed to read clip body: {e}"))
            })?;

            std::fs::write(dest, &bytes)?;
            Ok(())
        })
    }
}

/// Best available rendition: HD at or above `min_width`, then any HD, then
/// SD, then whatever exists.
pub fn best_video_url(video: &PexelsVideo, min_width: u32) -> Option<String> {
    let files = &video.video_files;

    files
        .iter()
        .find(|f| f.quality == "hd" && f.width >= min_width)
        .or_else(|| files.iter().find(|f| f.quality == "hd"))
        .or_else(|| files.iter().find(|f| f.quality == "sd"))
        .or_else(|| files.first())
        .map(|f| f.link.clone())
}

fn urlencode(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            ' ' => out.push('+'),
            other => {
                let mut buf = [0u8; 4];
                for byte in other.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}
