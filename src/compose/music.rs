//! Background music selection.

use crate::error::ShortgenResult;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "m4a", "ogg", "flac"];

/// Pick one track from `dir` for the given title.
///
/// The pick hashes the title over a sorted listing, so the same script always
/// gets the same track and different scripts spread across the library.
/// Returns `None` when the directory is missing or holds no audio files.
pub fn pick_track(dir: &Path, title: &str) -> ShortgenResult<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut tracks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    if tracks.is_empty() {
        return Ok(None);
    }
    tracks.sort();

    let index = (title_hash(title) % tracks.len() as u64) as usize;
    Ok(Some(tracks[index].clone()))
}

fn title_hash(title: &str) -> u64 {
    let digest = Sha256::digest(title.as_bytes());
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}
