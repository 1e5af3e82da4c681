use crate::config::load_settings;
use crate::crawl;
use crate::error::{ShortgenError, ShortgenResult};
use crate::pipeline::Pipeline;
use colored::*;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Produce `count` videos with at most `concurrency` running at once.
///
/// Each worker gets its own temp scope, so one failed run never corrupts
/// another. Failures are reported in the summary instead of stopping the
/// batch.
pub async fn run(
    project: &Path,
    count: usize,
    concurrency: usize,
    topics_file: Option<&Path>,
) -> ShortgenResult<()> {
    let settings = load_settings(project)?;
    let count = count.max(1);
    let topics = collect_topics(count, topics_file)?;

    eprintln!(
        "{} {count} videos, {} at a time",
        "batch:".cyan().bold(),
        concurrency.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(count);

    for (index, topic) in topics.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let mut worker_settings = settings.clone();
        worker_settings.run_tag = format!("batch{index:02}");

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| ShortgenError::Other(format!("batch semaphore closed: {e}")))?;

            let label = topic.clone().unwrap_or_else(|| "<crawled>".into());
            let outcome = tokio::task::spawn_blocking(move || {
                Pipeline::new(worker_settings).with_topic(topic).run()
            })
            .await
            .map_err(|e| ShortgenError::Other(format!("batch worker panicked: {e}")))?;

            outcome.map(|result| (label, result))
        }));
    }

    let mut produced = 0usize;
    let mut failed = 0usize;
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok((label, result))) => {
                produced += 1;
                eprintln!(
                    "{} [{index}] {} -> {} ({:.1}s, quality {})",
                    "ok:".green().bold(),
                    label,
                    result.output_path.display(),
                    result.duration_secs,
                    result.quality_score
                );
            }
            Ok(Err(e)) => {
                failed += 1;
                eprintln!("{} [{index}] {e}", "failed:".red().bold());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} [{index}] worker lost: {e}", "failed:".red().bold());
            }
        }
    }

    eprintln!(
        "{} {produced} produced, {failed} failed",
        "batch summary:".cyan().bold()
    );

    if produced == 0 {
        return Err(ShortgenError::Other(format!(
            "batch produced nothing ({failed} failures)"
        )));
    }
    Ok(())
}

/// One topic slot per requested video. `None` means the worker crawls for its
/// own topic.
fn collect_topics(count: usize, topics_file: Option<&Path>) -> ShortgenResult<Vec<Option<String>>> {
    let mut topics: Vec<String> = match topics_file {
        Some(path) => std::fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        None => crawl::fetch_trending_topics(),
    };
    topics.truncate(count);

    let mut slots: Vec<Option<String>> = topics.into_iter().map(Some).collect();
    while slots.len() < count {
        slots.push(None);
    }
    Ok(slots)
}
