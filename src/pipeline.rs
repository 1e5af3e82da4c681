//! End-to-end production orchestration.
//!
//! Stages run in a fixed order. A required stage failing aborts the run with
//! an error naming the stage; an optional stage failing is logged and skipped,
//! degrading the output instead of losing it.

use crate::background::{self, BackgroundSet};
use crate::compose;
use crate::config::Settings;
use crate::crawl::{self, Crawler, TopicSelection};
use crate::error::{ShortgenError, ShortgenResult};
use crate::history::{History, HistoryEntry};
use crate::metadata::{self, VideoMetadata};
use crate::quality::{self, judge::AiJudge, originality, QualityReport, QUALITY_THRESHOLD};
use crate::script::{generator::ScriptGenerator, Script};
use crate::tts;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crawl,
    ScriptGeneration,
    AiQuality,
    Narration,
    Background,
    Composition,
    Metadata,
    History,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Crawl => "crawl",
            Stage::ScriptGeneration => "script generation",
            Stage::AiQuality => "ai quality review",
            Stage::Narration => "narration",
            Stage::Background => "background",
            Stage::Composition => "composition",
            Stage::Metadata => "metadata",
            Stage::History => "history",
        }
    }

    /// A required stage failing aborts the run; optional stages degrade.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Stage::ScriptGeneration | Stage::Narration | Stage::Composition | Stage::Metadata
        )
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct ProductionResult {
    pub output_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: VideoMetadata,
    pub title: String,
    pub quality_score: u8,
    pub duration_secs: f64,
    pub narration_engine: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct Draft {
    script: Script,
    quality: QualityReport,
}

pub struct Pipeline {
    settings: Settings,
    topic: Option<String>,
    skip_crawl: bool,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            topic: None,
            skip_crawl: false,
        }
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic;
        self
    }

    pub fn with_skip_crawl(mut self, skip: bool) -> Self {
        self.skip_crawl = skip;
        self
    }

    /// Run the full production: topic -> script -> gates -> narration ->
    /// backgrounds -> composition -> metadata -> history.
    pub fn run(&self) -> ShortgenResult<ProductionResult> {
        let started_at = Utc::now();
        self.clean_temp();

        let topic = self.stage_crawl();
        info!("topic: {} (via {})", topic.title, topic.source);

        let history_path = self.settings.history_file();
        let history = match History::load(&history_path) {
            Ok(h) => h,
            Err(e) => {
                warn!("history unreadable, originality gate runs against nothing: {e}");
                History::empty(&history_path)
            }
        };

        let draft = self.stage_generate(&topic, &history)?;

        let narration = self.stage_narration(&draft.script)?;
        let backgrounds = self.stage_background(&draft.script);

        let output_path = self.output_file(&draft.script.title, started_at);
        let video_path = required(
            Stage::Composition,
            compose::compose(
                &self.settings,
                &draft.script,
                &backgrounds,
                &narration,
                &output_path,
            ),
        )?;
        let (video_metadata, metadata_path) = required(
            Stage::Metadata,
            metadata::generate(&draft.script, &video_path),
        )?;

        self.stage_history(&draft, &narration, &video_path, started_at);
        self.clean_temp();

        let finished_at = Utc::now();
        Ok(ProductionResult {
            output_path: video_path,
            metadata_path,
            metadata: video_metadata,
            title: draft.script.title.clone(),
            quality_score: draft.quality.score,
            duration_secs: narration.duration_secs,
            narration_engine: narration.engine,
            started_at,
            finished_at,
        })
    }

    fn stage_crawl(&self) -> TopicSelection {
        if self.skip_crawl && self.topic.is_none() {
            use rand::seq::SliceRandom;
            let topic = crawl::FALLBACK_TOPICS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(crawl::FALLBACK_TOPICS[0]);
            return TopicSelection {
                title: topic.to_string(),
                body: String::new(),
                source: "fallback".into(),
            };
        }

        let communities = self.settings.crawl.communities.clone();
        match Crawler::new(&self.settings.used_posts_file(), communities) {
            Ok(mut crawler) => crawl::select_topic(&mut crawler, self.topic.as_deref()),
            Err(e) => {
                warn!("{} stage skipped: {e}", Stage::Crawl.name());
                TopicSelection {
                    title: self
                        .topic
                        .clone()
                        .unwrap_or_else(|| crawl::FALLBACK_TOPICS[0].to_string()),
                    body: String::new(),
                    source: "fallback".into(),
                }
            }
        }
    }

    /// Bounded generation loop with the quality and originality gates inside.
    ///
    /// Accepts the first draft that clears both gates; with the AI judge
    /// enabled, the score the gate compares against the threshold is the
    /// blend of the rule score and the judge's. On exhaustion, strict mode
    /// aborts with the last rejection; lenient mode takes the best-scoring
    /// draft with a warning.
    fn stage_generate(&self, topic: &TopicSelection, history: &History) -> ShortgenResult<Draft> {
        let generator = required(
            Stage::ScriptGeneration,
            ScriptGenerator::new(&self.settings),
        )?;
        let max_attempts = self.settings.script.max_attempts.max(1);

        let judge = self.settings.script.quality_ai.then(AiJudge::from_env).flatten();
        if self.settings.script.quality_ai && judge.is_none() {
            warn!("{} skipped: ANTHROPIC_API_KEY not set", Stage::AiQuality.name());
        }

        let mut best: Option<Draft> = None;
        let mut last_rejection: Option<ShortgenError> = None;

        for attempt in 1..=max_attempts {
            let script = match generator.generate(&topic.title, &topic.body) {
                Ok(s) => s,
                Err(e) => {
                    warn!("generation attempt {attempt}/{max_attempts} failed: {e}");
                    last_rejection = Some(e);
                    continue;
                }
            };

            let mut quality_report = quality::check_script_quality(&script);
            if let Some(judge) = &judge {
                self.deep_review(judge, &script, &mut quality_report);
            }
            let originality_report = originality::check_originality(&script, history);

            if quality_report.passed() && originality_report.is_original {
                info!(
                    "draft accepted on attempt {attempt} (quality {})",
                    quality_report.score
                );
                let draft = Draft {
                    script,
                    quality: quality_report,
                };
                self.warn_factual_claims(&draft.script);
                return Ok(draft);
            }

            if !quality_report.passed() {
                warn!(
                    "attempt {attempt}: quality {} < {QUALITY_THRESHOLD}: {}",
                    quality_report.score,
                    quality_report.issues.join("; ")
                );
                last_rejection = Some(ShortgenError::QualityRejected {
                    score: quality_report.score,
                    threshold: QUALITY_THRESHOLD,
                });
            } else {
                warn!(
                    "attempt {attempt}: too similar ({:.2}) to '{}'",
                    originality_report.max_similarity, originality_report.similar_title
                );
                last_rejection = Some(ShortgenError::OriginalityRejected {
                    similarity: originality_report.max_similarity,
                    similar_title: originality_report.similar_title.clone(),
                });
            }

            let replace = best
                .as_ref()
                .map(|b| quality_report.score > b.quality.score)
                .unwrap_or(true);
            if replace {
                best = Some(Draft {
                    script,
                    quality: quality_report,
                });
            }
        }

        let rejection = last_rejection
            .unwrap_or_else(|| ShortgenError::Generation("no draft produced".into()));

        if self.settings.script.strict {
            return Err(ShortgenError::Stage {
                stage: Stage::ScriptGeneration.name(),
                source: Box::new(rejection),
            });
        }

        match best {
            Some(draft) => {
                warn!(
                    "retry budget spent, accepting best draft (quality {})",
                    draft.quality.score
                );
                self.warn_factual_claims(&draft.script);
                Ok(draft)
            }
            None => Err(ShortgenError::Stage {
                stage: Stage::ScriptGeneration.name(),
                source: Box::new(rejection),
            }),
        }
    }

    fn warn_factual_claims(&self, script: &Script) {
        let claims = quality::check_factual_claims(script);
        if !claims.is_empty() {
            warn!(
                "{} factual claim(s) to verify before publishing: {}",
                claims.len(),
                claims
                    .iter()
                    .map(|c| c.claim.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ")
            );
        }
    }

    /// Blend the judge's verdict into the report the gate decides on. A
    /// failed review leaves the rule score untouched; the judge never blocks
    /// a run by being unreachable.
    fn deep_review(&self, judge: &AiJudge, script: &Script, report: &mut QualityReport) {
        let stage = Stage::AiQuality.name();
        match judge.review(script) {
            Ok(verdict) => {
                info!(
                    "{stage}: grade {} (engagement {}, originality {})",
                    verdict.overall_grade, verdict.engagement_score, verdict.originality_score
                );
                if !verdict.monetization_safe {
                    warn!("{stage}: flagged as not monetization-safe: {:?}", verdict.risk_flags);
                }
                for suggestion in &verdict.improvements {
                    report.suggestions.push(suggestion.clone());
                }
                let blended = blend_scores(report.score, verdict.numeric_score());
                if blended != report.score {
                    info!("{stage}: score {} -> {} after deep review", report.score, blended);
                    report.score = blended;
                }
            }
            Err(e) => warn!("{stage} skipped: {e}"),
        }
    }

    fn stage_narration(&self, script: &Script) -> ShortgenResult<tts::NarrationTrack> {
        let chain = required(Stage::Narration, tts::create_chain(&self.settings.tts))?;
        info!("TTS chain: {}", chain.engine_names().join(" -> "));

        let temp_dir = self.settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;
        let audio_path = temp_dir.join("narration.wav");

        let cache_dir = self.settings.cache_dir();
        let cache_root = self.settings.tts.cache_enabled.then_some(cache_dir.as_path());

        required(
            Stage::Narration,
            chain.narrate(
                &script.full_text(),
                self.settings.tts.voice.as_deref(),
                self.settings.tts.speed,
                &audio_path,
                cache_root,
            ),
        )
    }

    fn stage_background(&self, script: &Script) -> BackgroundSet {
        let dest = self.settings.temp_dir().join("backgrounds");
        match background::acquire_backgrounds(&self.settings, script, &dest) {
            Ok(set) => set,
            Err(e) => {
                // composition will fail as the required stage and name itself
                warn!("{} stage failed: {e}", Stage::Background.name());
                BackgroundSet { clips: Vec::new() }
            }
        }
    }

    fn stage_history(
        &self,
        draft: &Draft,
        narration: &tts::NarrationTrack,
        video_path: &std::path::Path,
        started_at: DateTime<Utc>,
    ) {
        let entry = HistoryEntry {
            timestamp: started_at,
            title: draft.script.title.clone(),
            script: draft.script.full_text(),
            style: draft.script.style.as_str().to_string(),
            theme: draft.script.theme.clone(),
            quality_score: draft.quality.score,
            duration_secs: narration.duration_secs,
            output_path: video_path.to_path_buf(),
        };

        if let Err(e) = crate::history::record(&self.settings.history_file(), entry) {
            warn!("{} stage failed: {e}", Stage::History.name());
        }
    }

    fn output_file(&self, title: &str, started_at: DateTime<Utc>) -> PathBuf {
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let slug = slugify(title, 40);
        self.settings
            .output_dir()
            .join(format!("short_{stamp}_{slug}.mp4"))
    }

    fn clean_temp(&self) {
        let temp_dir = self.settings.temp_dir();
        if temp_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&temp_dir) {
                warn!("temp cleanup failed: {e}");
            }
        }
    }
}

fn required<T>(stage: Stage, result: ShortgenResult<T>) -> ShortgenResult<T> {
    result.map_err(|e| match e {
        already @ ShortgenError::Stage { .. } => already,
        other => ShortgenError::Stage {
            stage: stage.name(),
            source: Box::new(other),
        },
    })
}

/// Equal-weight mean of the rule score and the deep-review score. With the
/// judge enabled this blend is what the gate compares against the threshold.
fn blend_scores(rule: u8, judge: u8) -> u8 {
    ((rule as u16 + judge as u16) / 2) as u8
}

fn slugify(title: &str, max_chars: usize) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in title.chars() {
        if slug.chars().count() >= max_chars {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "untitled".into()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_stages() {
        assert!(Stage::ScriptGeneration.is_required());
        assert!(Stage::Narration.is_required());
        assert!(Stage::Composition.is_required());
        assert!(Stage::Metadata.is_required());
        assert!(!Stage::Crawl.is_required());
        assert!(!Stage::AiQuality.is_required());
        assert!(!Stage::Background.is_required());
        assert!(!Stage::History.is_required());
    }

    #[test]
    fn test_required_wraps_error_with_stage_name() {
        let result: ShortgenResult<()> = Err(ShortgenError::Tts("all engines failed".into()));
        let err = required(Stage::Narration, result).unwrap_err();
        assert!(err.to_string().contains("narration"));
    }

    #[test]
    fn test_required_does_not_double_wrap() {
        let inner = ShortgenError::Stage {
            stage: "narration",
            source: Box::new(ShortgenError::Tts("down".into())),
        };
        let err = required(Stage::Composition, Err::<(), _>(inner)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("narration"));
        assert_eq!(msg.matches("Required stage").count(), 1);
    }

    #[test]
    fn test_blend_scores_is_mean() {
        assert_eq!(blend_scores(80, 60), 70);
        assert_eq!(blend_scores(100, 100), 100);
        assert_eq!(blend_scores(75, 74), 74);
    }

    #[test]
    fn test_blended_score_can_fail_the_gate() {
        // a passing rule score dragged under the threshold by a low review
        let mut report = QualityReport {
            score: 90,
            issues: vec![],
            suggestions: vec![],
        };
        assert!(report.passed());
        report.score = blend_scores(report.score, 40);
        assert!(!report.passed());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Coworker's Revenge!", 40), "my-coworker-s-revenge");
        assert_eq!(slugify("   ", 40), "untitled");
        assert_eq!(slugify("a".repeat(80).as_str(), 10).len(), 10);
    }

    #[test]
    fn test_output_file_shape() {
        let mut settings = Settings::default();
        settings.project_dir = PathBuf::from("/proj");
        let pipeline = Pipeline::new(settings);
        let started = Utc::now();
        let path = pipeline.output_file("A Wild Story", started);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("short_"));
        assert!(name.ends_with("a-wild-story.mp4"));
        assert!(path.starts_with("/proj/output"));
    }
}
