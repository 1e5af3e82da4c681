//! Publishing metadata for a finished video.

use crate::error::ShortgenResult;
use crate::script::Script;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entertainment category.
const CATEGORY: &str = "24";

const DEFAULT_TAGS: [&str; 6] = ["shorts", "story", "storytime", "viral", "fyp", "reddit"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
    pub category: String,
    pub made_for_kids: bool,
    pub ai_disclosure: bool,
}

/// Build metadata for `script` and write it as pretty JSON next to the video.
///
/// The file lands at `<video stem>.metadata.json` in the video's directory.
pub fn generate(script: &Script, video_path: &Path) -> ShortgenResult<(VideoMetadata, PathBuf)> {
    let metadata = build_metadata(script);

    let meta_path = metadata_path_for(video_path);
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| crate::error::ShortgenError::Other(format!("metadata encode: {e}")))?;
    std::fs::write(&meta_path, json)?;

    Ok((metadata, meta_path))
}

fn build_metadata(script: &Script) -> VideoMetadata {
    let title = embellish_title(&script.title, &script.theme);
    let hashtags = collect_hashtags(script);
    let description = build_description(script, &hashtags);
    let tags = collect_tags(script);

    VideoMetadata {
        title,
        description,
        tags,
        hashtags,
        category: CATEGORY.to_string(),
        made_for_kids: false,
        ai_disclosure: true,
    }
}

fn metadata_path_for(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video_path.with_file_name(format!("{stem}.metadata.json"))
}

fn theme_emoji(theme: &str) -> &'static str {
    match theme {
        "horror" => "😱",
        "funny" => "😂",
        "touching" => "🥺",
        "shocking" => "🤯",
        _ => "🔍",
    }
}

fn embellish_title(title: &str, theme: &str) -> String {
    let title = title.trim();
    format!("{title} {}", theme_emoji(theme))
}

fn collect_hashtags(script: &Script) -> Vec<String> {
    let mut hashtags: Vec<String> = vec!["#shorts".to_string()];
    for tag in &script.hashtags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{tag}")
        };
        if !hashtags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            hashtags.push(tag);
        }
    }
    hashtags.truncate(10);
    hashtags
}

fn collect_tags(script: &Script) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.trim().trim_start_matches('#');
        if !tag.is_empty() && !tags.iter().any(|t: &String| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    };

    for kw in &script.keywords {
        push(kw);
    }
    push(&script.theme);
    for tag in DEFAULT_TAGS {
        push(tag);
    }

    tags.truncate(20);
    tags
}

fn build_description(script: &Script, hashtags: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();

    // opening lines as the teaser
    let teaser: Vec<&str> = script
        .sentences
        .iter()
        .take(2)
        .map(|s| s.text.as_str())
        .collect();
    if !teaser.is_empty() {
        parts.push(teaser.join(" "));
        parts.push(String::new());
    }

    parts.push("This video was produced with AI assistance (script, narration, editing).".into());
    parts.push(String::new());
    parts.push(hashtags.join(" "));

    parts.join("\n")
}
