//! Final video composition.
//!
//! Backgrounds are normalized into uniform segments, joined (hard cut or
//! crossfade), then rendered in a single FFmpeg pass that layers the darkening
//! overlay, title bar, burned subtitles, progress bar, narration, and ducked
//! background music. Given identical inputs the render is identical; nothing
//! here is randomized.

pub mod music;

use crate::background::BackgroundSet;
use crate::config::{QualityPreset, Settings};
use crate::error::{ShortgenError, ShortgenResult};
use crate::script::Script;
use crate::subtitle;
use crate::tts::NarrationTrack;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const SUBTITLE_STYLE: &str = "FontSize=30,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,\
BackColour=&H80000000,BorderStyle=3,Outline=2,Shadow=1,Alignment=2,MarginV=60";

const DARKEN: f64 = 0.25;
const PROGRESS_BAR_HEIGHT: u32 = 8;

/// Render the final video to `output_path`.
///
/// The partial render lives under the temp directory and is moved into place
/// only after FFmpeg exits cleanly. Output duration equals the narration
/// duration, capped at the configured target.
pub fn compose(
    settings: &Settings,
    script: &Script,
    backgrounds: &BackgroundSet,
    narration: &NarrationTrack,
    output_path: &Path,
) -> ShortgenResult<PathBuf> {
    if backgrounds.clips.is_empty() {
        return Err(ShortgenError::Background(
            "no background clips to compose".into(),
        ));
    }

    let duration = narration
        .duration_secs
        .min(settings.video.target_duration)
        .max(1.0);

    let temp_dir = settings.temp_dir();
    std::fs::create_dir_all(&temp_dir)?;

    // 1. uniform background segments, cycled to cover the narration
    let plan = plan_segments(
        backgrounds.clips.len(),
        duration,
        settings.video.segment_seconds,
    );
    let mut segment_files = Vec::with_capacity(plan.len());
    for (i, clip_index) in plan.iter().enumerate() {
        let out = temp_dir.join(format!("seg_{i:02}.mp4"));
        normalize_segment(
            &backgrounds.clips[*clip_index].path,
            &out,
            settings.video.width,
            settings.video.height,
            settings.video.fps,
            settings.video.segment_seconds,
        )?;
        segment_files.push(out);
    }

    // 2. join segments
    let bg_track = temp_dir.join("background.mp4");
    if settings.video.crossfade_duration > 0.0 && segment_files.len() > 1 {
        join_segments_crossfade(
            &segment_files,
            settings.video.segment_seconds,
            settings.video.crossfade_duration,
            &bg_track,
            &QualityPreset::from_name(&settings.output.quality),
        )?;
    } else {
        join_segments_copy(&segment_files, &bg_track)?;
    }

    // 3. subtitles, with emotion markers carried over from the script
    let srt_path = temp_dir.join("subtitles.srt");
    let entries = subtitle::group_into_subtitles(
        &narration.words,
        settings.output.max_words_per_subtitle,
        &subtitle::word_emotions(&script.sentences),
    );
    std::fs::write(&srt_path, subtitle::to_srt(&entries))?;

    // 4. music (optional)
    let music_track = match settings.music_dir() {
        Some(dir) => music::pick_track(&dir, &script.title)?,
        None => None,
    };
    if let Some(track) = &music_track {
        info!("music: {}", track.display());
    }

    // 5. final render into temp, then move into place
    let render_path = temp_dir.join("render.mp4");
    let result = render_final(
        settings,
        script,
        &bg_track,
        &narration.audio_path,
        music_track.as_deref(),
        &srt_path,
        duration,
        &render_path,
    );
    if let Err(e) = result {
        let _ = std::fs::remove_file(&render_path);
        return Err(e);
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(&render_path, output_path).is_err() {
        // temp and output may sit on different filesystems
        std::fs::copy(&render_path, output_path)?;
        let _ = std::fs::remove_file(&render_path);
    }

    info!("composed {} ({duration:.1}s)", output_path.display());
    Ok(output_path.to_path_buf())
}

/// Which background clip each segment shows, cycling through the set.
fn plan_segments(clip_count: usize, duration: f64, segment_seconds: f64) -> Vec<usize> {
    let clip_count = clip_count.max(1);
    let segment_seconds = if segment_seconds > 0.0 {
        segment_seconds
    } else {
        5.0
    };
    let needed = (duration / segment_seconds).ceil().max(1.0) as usize;
    (0..needed).map(|i| i % clip_count).collect()
}

/// Re-encode one clip to the output frame: trimmed, cover-scaled, cropped,
/// constant fps, audio stripped.
fn normalize_segment(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    fps: u32,
    segment_seconds: f64,
) -> ShortgenResult<()> {
    let vf = format!(
        "scale={width}:{height}:force_original_aspect_ratio=increase,\
         crop={width}:{height},fps={fps}"
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-i"])
        .arg(input)
        .args(["-t", &format!("{segment_seconds:.3}")])
        .args(["-vf", &vf])
        .args(["-an", "-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"])
        .arg(output);

    run_ffmpeg(cmd, "segment normalize")
}

/// Stream-copy concat of uniform segments via the concat demuxer.
fn join_segments_copy(segments: &[PathBuf], output: &Path) -> ShortgenResult<()> {
    if segments.len() == 1 {
        std::fs::copy(&segments[0], output)?;
        return Ok(());
    }

    let list_dir = output.parent().unwrap_or(Path::new("."));
    let list_path = list_dir.join(".concat-list.txt");
    let mut list = String::new();
    for path in segments {
        list.push_str(&format!("file '{}'\n", path.display()));
    }
    std::fs::write(&list_path, &list)?;

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(output);

    let result = run_ffmpeg(cmd, "background concat");
    let _ = std::fs::remove_file(&list_path);
    result
}

/// Re-encoding concat with an xfade between adjacent segments.
fn join_segments_crossfade(
    segments: &[PathBuf],
    segment_seconds: f64,
    crossfade: f64,
    output: &Path,
    preset: &QualityPreset,
) -> ShortgenResult<()> {
    let filter = build_xfade_filter(segments.len(), segment_seconds, crossfade);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    for segment in segments {
        cmd.arg("-i").arg(segment);
    }
    cmd.args(["-filter_complex", &filter, "-map", "[vout]"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .args(["-crf", &preset.crf.to_string(), "-preset", preset.preset])
        .arg(output);

    run_ffmpeg(cmd, "background crossfade")
}

fn build_xfade_filter(n: usize, segment_seconds: f64, crossfade: f64) -> String {
    // crossfade must leave some of each segment visible
    let crossfade = crossfade.min(segment_seconds / 2.0).max(0.001);
    let mut parts = Vec::new();
    let mut offset = 0.0;

    for i in 0..n - 1 {
        offset += segment_seconds - crossfade;
        let input_a = if i == 0 {
            "[0:v]".to_string()
        } else {
            format!("[v{i}]")
        };
        let input_b = format!("[{}:v]", i + 1);
        let output_label = if i == n - 2 {
            "[vout]".to_string()
        } else {
            format!("[v{}]", i + 1)
        };
        parts.push(format!(
            "{input_a}{input_b}xfade=transition=fade:duration={crossfade:.3}:offset={offset:.3}{output_label}"
        ));
    }

    parts.join(";")
}

#[allow(clippy::too_many_arguments)]
fn render_final(
    settings: &Settings,
    script: &Script,
    bg_track: &Path,
    narration: &Path,
    music_track: Option<&Path>,
    srt_path: &Path,
    duration: f64,
    output: &Path,
) -> ShortgenResult<()> {
    let preset = QualityPreset::from_name(&settings.output.quality);

    let video_filter = build_video_filter(
        duration,
        settings.video.width,
        &script.title,
        srt_path,
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-i"]).arg(bg_track);
    cmd.arg("-i").arg(narration);

    let filter_complex = if let Some(music) = music_track {
        // loop short tracks; amix duration=first ends with the narration
        cmd.args(["-stream_loop", "-1", "-i"]).arg(music);
        let audio_filter = build_audio_filter(settings.music.volume, settings.music.ducking);
        format!("{video_filter};{audio_filter}")
    } else {
        video_filter
    };

    cmd.args(["-filter_complex", &filter_complex, "-map", "[vout]"]);
    if music_track.is_some() {
        cmd.args(["-map", "[aout]"]);
    } else {
        cmd.args(["-map", "1:a"]);
    }

    cmd.args(["-t", &format!("{duration:.3}")])
        .args(["-r", &settings.video.fps.to_string()])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .args(["-crf", &preset.crf.to_string(), "-preset", preset.preset])
        .args(["-movflags", "+faststart"])
        .args(["-c:a", "aac", "-b:a", preset.audio_bitrate])
        .args(["-ar", &preset.audio_samplerate.to_string()])
        .arg(output);

    debug!(
        "final render: {}x{} @ {}fps, crf={}, music={}",
        settings.video.width,
        settings.video.height,
        settings.video.fps,
        preset.crf,
        music_track.is_some()
    );

    run_ffmpeg(cmd, "final render")
}

/// The video layer stack: darken, title bar + title, progress bar, subtitles.
fn build_video_filter(duration: f64, width: u32, title: &str, srt_path: &Path) -> String {
    let title = escape_drawtext(&truncate_title(title, 60));
    let srt = escape_filter_path(srt_path);
    let font_size = (width / 18).max(24);
    let bar_h = PROGRESS_BAR_HEIGHT;

    let base = format!(
        "[0:v]trim=0:{duration:.3},setpts=PTS-STARTPTS,\
         eq=brightness=-{DARKEN:.2}:contrast=1.1,\
         drawbox=y=0:w=iw:h=ih/7:color=black@0.55:t=fill,\
         drawtext=text='{title}':fontcolor=white:fontsize={font_size}:\
borderw=2:bordercolor=black:x=(w-text_w)/2:y=(h/7-text_h)/2[vt]"
    );
    let bar = format!("color=c=white@0.85:s={width}x{bar_h}:d={duration:.3}[bar]");
    let progress = format!(
        "[vt][bar]overlay=x='-W+W*t/{duration:.3}':y=H-{bar_h}:shortest=1[vbar]"
    );
    let subs = format!("[vbar]subtitles=filename='{srt}':force_style='{SUBTITLE_STYLE}'[vout]");

    format!("{base};{bar};{progress};{subs}")
}

/// The audio graph. Narration is input 1, music input 2.
fn build_audio_filter(music_volume: f64, ducking: bool) -> String {
    if ducking {
        format!(
            "[1:a]asplit=2[vo][sc];[2:a]volume={music_volume:.2}[bgm];\
             [bgm][sc]sidechaincompress=threshold=0.05:ratio=8:attack=50:release=300[duckedbgm];\
             [vo][duckedbgm]amix=inputs=2:duration=first:dropout_transition=2[aout]"
        )
    } else {
        format!(
            "[1:a]volume=1.0[vo];[2:a]volume={music_volume:.2}[bgm];\
             [vo][bgm]amix=inputs=2:duration=first:dropout_transition=2[aout]"
        )
    }
}

fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let cut: String = title.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Escape text for FFmpeg's drawtext filter.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// Escape a path for use inside a filter graph string.
fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\:")
}

fn run_ffmpeg(mut cmd: Command, context: &str) -> ShortgenResult<()> {
    let output = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ShortgenError::Ffmpeg(format!("Failed to spawn ffmpeg ({context}): {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_line = stderr.lines().last().unwrap_or("unknown error");
        return Err(ShortgenError::Ffmpeg(format!("{context} failed: {last_line}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_segments_cycles_clips() {
        let plan = plan_segments(3, 24.0, 5.0);
        assert_eq!(plan, vec![0, 1, 2, 0, 1]); // ceil(24/5) = 5 segments
    }

    #[test]
    fn test_plan_segments_single_clip() {
        let plan = plan_segments(1, 12.0, 5.0);
        assert_eq!(plan, vec![0, 0, 0]);
    }

    #[test]
    fn test_plan_segments_short_video() {
        assert_eq!(plan_segments(8, 3.0, 5.0), vec![0]);
    }

    #[test]
    fn test_xfade_filter_offsets() {
        let filter = build_xfade_filter(3, 5.0, 0.5);
        assert!(filter.contains("offset=4.500"));
        assert!(filter.contains("offset=9.000"));
        assert!(filter.contains("[0:v][1:v]xfade"));
        assert!(filter.ends_with("[vout]"));
    }

    #[test]
    fn test_xfade_clamped_to_half_segment() {
        let filter = build_xfade_filter(2, 4.0, 10.0);
        assert!(filter.contains("duration=2.000"), "got: {filter}");
    }

    #[test]
    fn test_video_filter_layer_order() {
        let filter = build_video_filter(30.0, 1080, "My Title", Path::new("/tmp/subs.srt"));
        let eq_pos = filter.find("eq=brightness").unwrap();
        let title_pos = filter.find("drawtext").unwrap();
        let bar_pos = filter.find("overlay").unwrap();
        let subs_pos = filter.find("subtitles=").unwrap();
        assert!(eq_pos < title_pos && title_pos < bar_pos && bar_pos < subs_pos);
        assert!(filter.contains("force_style"));
        assert!(filter.ends_with("[vout]"));
    }

    #[test]
    fn test_audio_filter_ducking() {
        let filter = build_audio_filter(0.25, true);
        assert!(filter.contains("sidechaincompress"));
        assert!(filter.contains("volume=0.25"));
        assert!(filter.contains("amix=inputs=2:duration=first"));
    }

    #[test]
    fn test_audio_filter_plain_mix() {
        let filter = build_audio_filter(0.30, false);
        assert!(!filter.contains("sidechaincompress"));
        assert!(filter.contains("volume=0.30"));
        assert!(filter.contains("amix"));
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("it's 50%: fine"), "it\\'s 50\\%\\: fine");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\temp\\subs.srt")),
            "C\\:/temp/subs.srt"
        );
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short", 60), "short");
        let long = "x".repeat(80);
        let cut = truncate_title(&long, 60);
        assert!(cut.chars().count() <= 60);
        assert!(cut.ends_with('…'));
    }
}
