use crate::config::{load_settings, Settings};
use crate::error::ShortgenResult;
use crate::pipeline::Pipeline;
use colored::*;
use std::path::Path;

/// CLI overrides layered on top of the project config.
#[derive(Debug, Default, Clone)]
pub struct ProduceOptions {
    pub topic: Option<String>,
    pub style: Option<String>,
    pub source: Option<String>,
    pub skip_crawl: bool,
    pub no_stock: bool,
    pub tts: Option<String>,
    pub quality: Option<String>,
    pub quality_ai: bool,
    pub strict: bool,
}

pub fn run(project: &Path, opts: ProduceOptions) -> ShortgenResult<()> {
    let mut settings = load_settings(project)?;
    apply_overrides(&mut settings, &opts);

    eprintln!(
        "{} style={}, tts={}, quality={}{}",
        "produce:".cyan().bold(),
        settings.script.style,
        settings.tts.engine,
        settings.output.quality,
        if settings.script.strict { ", strict" } else { "" }
    );

    let result = Pipeline::new(settings)
        .with_topic(opts.topic)
        .with_skip_crawl(opts.skip_crawl)
        .run()?;

    let elapsed = (result.finished_at - result.started_at).num_seconds();
    eprintln!(
        "{} {} ({:.1}s video, quality {}, voice: {}, {}s elapsed)",
        "done:".green().bold(),
        result.output_path.display(),
        result.duration_secs,
        result.quality_score,
        result.narration_engine,
        elapsed
    );
    eprintln!(
        "{} {}",
        "metadata:".cyan().bold(),
        result.metadata_path.display()
    );

    Ok(())
}

pub fn apply_overrides(settings: &mut Settings, opts: &ProduceOptions) {
    if let Some(style) = &opts.style {
        settings.script.style = style.clone();
    }
    if let Some(source) = &opts.source {
        settings.crawl.communities = vec![source.clone()];
    }
    if let Some(tts) = &opts.tts {
        settings.tts.engine = tts.clone();
    }
    if let Some(quality) = &opts.quality {
        settings.output.quality = quality.clone();
    }
    if opts.no_stock {
        settings.background.use_stock = false;
    }
    if opts.quality_ai {
        settings.script.quality_ai = true;
    }
    if opts.strict {
        settings.script.strict = true;
    }
}
