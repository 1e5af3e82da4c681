use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "shortgen",
    about = "Automated short-video production — crawl a topic, write a script, narrate, compose",
    version,
    after_help = "\x1b[1mExamples:\x1b[0m
  shortgen produce                       Crawl a topic and produce one video
  shortgen produce \"my terrible boss\"    Produce a video about a given topic
  shortgen produce --strict --quality high   Abort instead of accepting weak drafts
  shortgen batch 5 --concurrency 2       Produce five videos, two at a time
  shortgen topics                        Show trending topic suggestions
  shortgen history --count 20            Show the last 20 productions"
)]
pub struct Cli {
    /// Project directory (holds shortgen.toml, output/, data/, cache/)
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce a single video end to end
    Produce {
        /// Topic to cover; omitted = crawl community posts for one
        topic: Option<String>,

        /// Script style: community, creative, analytical, emotional, humorous, expert
        #[arg(long)]
        style: Option<String>,

        /// Crawl a single community instead of the configured list
        #[arg(long)]
        source: Option<String>,

        /// Skip crawling even when no topic is given (uses the fallback pool)
        #[arg(long)]
        skip_crawl: bool,

        /// Disable stock footage; backgrounds are generated locally
        #[arg(long)]
        no_stock: bool,

        /// TTS engine: enhanced (provider chain), legacy, elevenlabs, openai, edge
        #[arg(long)]
        tts: Option<String>,

        /// Output quality: draft, standard, high
        #[arg(long)]
        quality: Option<String>,

        /// Also run the AI reviewer on the accepted script (advisory)
        #[arg(long)]
        quality_ai: bool,

        /// Abort when the gate retry budget is spent instead of accepting
        /// the best-scoring draft
        #[arg(long)]
        strict: bool,
    },
    /// Produce several videos with a bounded number of concurrent workers
    Batch {
        /// How many videos to produce
        #[arg(default_value_t = 3)]
        count: usize,

        /// Maximum productions running at once
        #[arg(long, default_value_t = 2)]
        concurrency: usize,

        /// File with one topic per line; omitted = trending + fallback topics
        #[arg(long)]
        topics_file: Option<PathBuf>,
    },
    /// Print trending topic suggestions
    Topics,
    /// Show recent production history
    History {
        /// Number of entries to show
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}
