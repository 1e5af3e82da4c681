//! Background footage acquisition.
//!
//! Stock footage first (when enabled and credentialed), locally generated
//! gradient clips as the guaranteed fallback. The fallback never touches the
//! network, so this stage cannot leave the pipeline without footage.

pub mod generated;
pub mod pexels;

use crate::config::Settings;
use crate::error::{ShortgenError, ShortgenResult};
use crate::script::Script;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Stock,
    Generated,
}

#[derive(Debug, Clone)]
pub struct BackgroundAsset {
    pub path: PathBuf,
    pub source: AssetSource,
}

#[derive(Debug)]
pub struct BackgroundSet {
    pub clips: Vec<BackgroundAsset>,
}

impl BackgroundSet {
    pub fn stock_count(&self) -> usize {
        self.clips
            .iter()
            .filter(|c| c.source == AssetSource::Stock)
            .count()
    }
}

/// Collect `clip_count` background clips for the script into `dest_dir`.
///
/// Stock clips come from the script's search keywords; any shortfall is
/// filled with generated clips themed to the script. Returns an error only
/// if even local generation produced nothing.
pub fn acquire_backgrounds(
    settings: &Settings,
    script: &Script,
    dest_dir: &Path,
) -> ShortgenResult<BackgroundSet> {
    std::fs::create_dir_all(dest_dir)?;

    let target = settings.background.clip_count.max(1);
    let mut clips: Vec<BackgroundAsset> = Vec::new();

    if settings.background.use_stock {
        match pexels::PexelsClient::from_env() {
            Some(client) => {
                clips = fetch_stock_clips(&client, settings, script, dest_dir, target);
                info!("stock footage: {}/{} clips", clips.len(), target);
            }
            None => {
                warn!("PEXELS_API_KEY not set, using generated backgrounds only");
            }
        }
    }

    // fill the remainder locally
    let shortfall = target.saturating_sub(clips.len());
    for index in 0..shortfall {
        let out = dest_dir.join(format!("generated_{index:02}.mp4"));
        match generated::generate_clip(
            &script.theme,
            index,
            settings.video.width,
            settings.video.height,
            settings.video.fps,
            settings.video.segment_seconds,
            &out,
        ) {
            Ok(()) => clips.push(BackgroundAsset {
                path: out,
                source: AssetSource::Generated,
            }),
            Err(e) => warn!("generated clip {index} failed: {e}"),
        }
    }

    if clips.is_empty() {
        return Err(ShortgenError::Background(
            "no background clips could be acquired (stock and generated both failed)".into(),
        ));
    }

    Ok(BackgroundSet { clips })
}

fn fetch_stock_clips(
    client: &pexels::PexelsClient,
    settings: &Settings,
    script: &Script,
    dest_dir: &Path,
    target: usize,
) -> Vec<BackgroundAsset> {
    let mut clips = Vec::new();

    'keywords: for keyword in &script.search_keywords {
        let videos = match client.search(keyword, 10) {
            Ok(v) => v,
            Err(e) => {
                warn!("stock search '{keyword}' failed: {e}");
                continue;
            }
        };

        for video in videos {
            if clips.len() >= target {
                break 'keywords;
            }
            let Some(url) = pexels::best_video_url(&video, settings.background.min_clip_width)
            else {
                continue;
            };
            let out = dest_dir.join(format!("stock_{:02}.mp4", clips.len()));
            match client.download(&url, &out) {
                Ok(()) => clips.push(BackgroundAsset {
                    path: out,
                    source: AssetSource::Stock,
                }),
                Err(e) => warn!("stock download failed: {e}"),
            }
        }
    }

    clips
}
