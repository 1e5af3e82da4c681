mod background;
mod cli;
mod commands;
mod compose;
mod config;
mod crawl;
mod error;
mod history;
mod metadata;
mod pipeline;
mod quality;
mod retry;
mod script;
mod subtitle;
mod tts;

use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use error::ShortgenResult;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Tracing goes to stderr, gated on RUST_LOG
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{} {}", "hint:".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ShortgenResult<()> {
    match cli.command {
        Command::Produce {
            topic,
            style,
            source,
            skip_crawl,
            no_stock,
            tts,
            quality,
            quality_ai,
            strict,
        } => {
            let opts = commands::produce::ProduceOptions {
                topic,
                style,
                source,
                skip_crawl,
                no_stock,
                tts,
                quality,
                quality_ai,
                strict,
            };
            // the whole pipeline is blocking (HTTP + subprocesses)
            let project = cli.project.clone();
            tokio::task::spawn_blocking(move || commands::produce::run(&project, opts))
                .await
                .map_err(|e| error::ShortgenError::Other(format!("worker panicked: {e}")))?
        }
        Command::Batch {
            count,
            concurrency,
            topics_file,
        } => commands::batch::run(&cli.project, count, concurrency, topics_file.as_deref()).await,
        Command::Topics => commands::topics::run(),
        Command::History { count } => commands::history::run(&cli.project, count),
    }
}
