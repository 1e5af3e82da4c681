use crate::crawl;
use crate::error::ShortgenResult;
use colored::*;

pub fn run() -> ShortgenResult<()> {
    let trending = crawl::fetch_trending_topics();

    if trending.is_empty() {
        eprintln!(
            "{} trends feed unreachable, showing the built-in pool",
            "note:".yellow().bold()
        );
        for (i, topic) in crawl::FALLBACK_TOPICS.iter().enumerate() {
            println!("{:2}. {topic}", i + 1);
        }
        return Ok(());
    }

    println!("{}", "Trending now:".bold());
    for (i, topic) in trending.iter().enumerate() {
        println!("{:2}. {topic}", i + 1);
    }
    Ok(())
}
