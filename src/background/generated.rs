//! Locally generated animated gradient backgrounds.
//!
//! Rendered with FFmpeg's `gradients` lavfi source, so the fallback works
//! offline and still gives the frame gentle motion. Palettes are keyed to the
//! script theme; the pick is deterministic per clip index.

use crate::error::{ShortgenError, ShortgenResult};
use std::path::Path;
use std::process::Command;

/// Two-stop gradient palettes per theme, dark-to-light ordering preserved.
fn theme_palettes(theme: &str) -> &'static [(&'static str, &'static str)] {
    match theme {
        "horror" => &[("#1a0a0a", "#3d0000"), ("#0d0d0d", "#2a0a0a")],
        "funny" => &[("#ff9a9e", "#fad0c4"), ("#f093fb", "#f5576c")],
        "touching" => &[("#a18cd1", "#fbc2eb"), ("#ffecd2", "#fcb69f")],
        "shocking" => &[("#f5af19", "#f12711"), ("#eb3349", "#f45c43")],
        // mystery doubles as the catch-all
        _ => &[("#0f0c29", "#302b63"), ("#141e30", "#243b55")],
    }
}

/// The lavfi source string for one gradient clip.
fn gradient_filter(theme: &str, index: usize, width: u32, height: u32) -> String {
    let palettes = theme_palettes(theme);
    let (c0, c1) = palettes[index % palettes.len()];
    format!("gradients=s={width}x{height}:c0={c0}:c1={c1}:speed=0.02")
}

/// Render one animated gradient clip of `duration` seconds to `output_path`.
pub fn generate_clip(
    theme: &str,
    index: usize,
    width: u32,
    height: u32,
    fps: u32,
    duration: f64,
    output_path: &Path,
) -> ShortgenResult<()> {
    let filter = gradient_filter(theme, index, width, height);

    let output = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", &filter])
        .args(["-t", &format!("{duration:.2}")])
        .args(["-r", &fps.to_string()])
        .args(["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"])
        .arg(output_path)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .output()
        .map_err(|e| ShortgenError::Background(format!("Failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_line = stderr.lines().last().unwrap_or("unknown error");
        return Err(ShortgenError::Background(format!(
            "gradient render failed: {last_line}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_cover_all_themes() {
        for theme in ["horror", "funny", "touching", "shocking", "mystery"] {
            assert!(!theme_palettes(theme).is_empty(), "no palette for {theme}");
        }
    }

    #[test]
    fn test_unknown_theme_uses_catch_all() {
        assert_eq!(theme_palettes("noir"), theme_palettes("mystery"));
    }

    #[test]
    fn test_gradient_filter_shape() {
        let filter = gradient_filter("horror", 0, 1080, 1920);
        assert_eq!(filter, "gradients=s=1080x1920:c0=#1a0a0a:c1=#3d0000:speed=0.02");
    }

    #[test]
    fn test_gradient_filter_cycles_palettes() {
        let a = gradient_filter("funny", 0, 1080, 1920);
        let b = gradient_filter("funny", 1, 1080, 1920);
        let c = gradient_filter("funny", 2, 1080, 1920);
        assert_ne!(a, b);
        assert_eq!(a, c); // wraps around deterministically
    }
}
