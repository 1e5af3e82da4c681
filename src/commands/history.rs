use crate::config::load_settings;
use crate::error::ShortgenResult;
use crate::history::History;
use colored::*;
use std::path::Path;

pub fn run(project: &Path, count: usize) -> ShortgenResult<()> {
    let settings = load_settings(project)?;
    let history = History::load(&settings.history_file())?;

    if history.entries().is_empty() {
        println!("No productions yet.");
        return Ok(());
    }

    println!(
        "{} ({} of {} entries)",
        "Production history".bold(),
        history.recent(count).len(),
        history.entries().len()
    );
    for entry in history.recent(count).iter().rev() {
        println!(
            "{}  {}  {} ({:.1}s, quality {})",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.theme.cyan(),
            entry.title,
            entry.duration_secs,
            entry.quality_score
        );
        println!("    {}", entry.output_path.display().to_string().dimmed());
    }
    Ok(())
}
