//! Script quality gate.
//!
//! Rule-based scoring runs on every draft: start at 100 and deduct per issue.
//! The optional AI judge (`judge`) and the originality check (`originality`)
//! layer on top.

pub mod judge;
pub mod originality;

use crate::script::prompt::BANNED_PHRASES;
use crate::script::Script;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Minimum rule-based score a draft needs to pass the gate.
pub const QUALITY_THRESHOLD: u8 = 75;

const MIN_CHARS: usize = 150;
const MAX_CHARS: usize = 1500;

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub score: u8,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.score >= QUALITY_THRESHOLD
    }
}

/// Score a draft against the house rules. Deductions, not additions: a clean
/// script keeps 100.
pub fn check_script_quality(script: &Script) -> QualityReport {
    let text = script.full_text();
    let lower = text.to_lowercase();
    let mut score: i32 = 100;
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let chars = text.chars().count();
    if chars < MIN_CHARS {
        issues.push(format!("script too short ({chars} chars < {MIN_CHARS})"));
        score -= 20;
    } else if chars > MAX_CHARS {
        issues.push(format!("script too long ({chars} chars > {MAX_CHARS})"));
        score -= 10;
    }

    for phrase in BANNED_PHRASES {
        if lower.contains(phrase) {
            issues.push(format!("stock filler phrase: '{phrase}'"));
            score -= 15;
        }
    }

    if text.contains("**") {
        issues.push("markdown bold survived cleaning".into());
        score -= 10;
    }

    for (pattern, warning) in misleading_patterns() {
        if pattern.is_match(&lower) {
            issues.push(format!("misleading claim: {warning}"));
            score -= 10;
        }
    }

    // duplicate sentences read as padding
    let mut seen: HashSet<&str> = HashSet::new();
    for sentence in &script.sentences {
        let trimmed = sentence.text.trim();
        if trimmed.chars().count() > 10 && !seen.insert(trimmed) {
            issues.push("repeated sentence".into());
            score -= 5;
            break;
        }
    }

    // a flat emotional arc loses viewers
    let mut run = 1usize;
    let mut monotone = false;
    for pair in script.sentences.windows(2) {
        if pair[0].emotion == pair[1].emotion {
            run += 1;
            if run > 3 {
                monotone = true;
                break;
            }
        } else {
            run = 1;
        }
    }
    if monotone {
        suggestions.push("more than 3 consecutive sentences share one emotion".into());
        score -= 5;
    }

    if let Some(first) = script.sentences.first() {
        if !is_hooky(&first.text) {
            suggestions.push("opening sentence doesn't hook (no question, exclamation, or direct address)".into());
            score -= 5;
        }
    }

    QualityReport {
        score: score.clamp(0, 100) as u8,
        issues,
        suggestions,
    }
}

fn is_hooky(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    sentence.contains('?')
        || sentence.contains('!')
        || lower.contains("you")
        || lower.starts_with("true story")
        || lower.starts_with("imagine")
        || lower.starts_with("this")
}

fn misleading_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"100%\s*(guaranteed|certain|effective)").unwrap(),
                "absolute guarantee",
            ),
            (
                Regex::new(r"guaranteed\s*(cure|treatment)").unwrap(),
                "medical guarantee",
            ),
            (
                Regex::new(r"(guaranteed|risk-free)\s*(money|profit|returns)").unwrap(),
                "financial guarantee",
            ),
        ]
    })
}

/// A statement in the script that cites numbers or authority and therefore
/// needs a source before publishing.
#[derive(Debug, Clone)]
pub struct FactualClaim {
    pub claim: String,
    pub context: String,
    pub kind: &'static str,
}

pub fn check_factual_claims(script: &Script) -> Vec<FactualClaim> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"\d[\d,.]*\s*(?:%|percent)").unwrap(),
                "statistic",
            ),
            (
                Regex::new(r"\d[\d,.]*\s*(?:people|million|billion|thousand)").unwrap(),
                "headcount or scale",
            ),
            (
                Regex::new(r"\d[\d,.]*\s*(?:x|times)\b").unwrap(),
                "comparison figure",
            ),
            (
                Regex::new(r"(?:studies|research)\s+(?:show|shows|found|suggest)").unwrap(),
                "research citation",
            ),
            (
                Regex::new(r"(?:experts|scientists|doctors)\s+(?:say|agree|warn|found)").unwrap(),
                "appeal to authority",
            ),
        ]
    });

    let text = script.full_text();
    let lower = text.to_lowercase();
    let mut claims = Vec::new();

    for (pattern, kind) in patterns {
        for m in pattern.find_iter(&lower) {
            let start = m.start().saturating_sub(20);
            let end = (m.end() + 20).min(lower.len());
            // clamp to char boundaries for the context window
            let start = (0..=start).rev().find(|&i| lower.is_char_boundary(i)).unwrap_or(0);
            let end = (end..=lower.len()).find(|&i| lower.is_char_boundary(i)).unwrap_or(lower.len());
            claims.push(FactualClaim {
                claim: m.as_str().to_string(),
                context: lower[start..end].to_string(),
                kind,
            });
        }
    }

    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{EmotionTag, ScriptStyle, Sentence};

    fn script_from(texts: &[&str]) -> Script {
        script_with_emotions(&texts.iter().map(|t| (*t, EmotionTag::Neutral)).collect::<Vec<_>>())
    }

    fn script_with_emotions(pairs: &[(&str, EmotionTag)]) -> Script {
        Script {
            title: "test".into(),
            sentences: pairs
                .iter()
                .map(|(t, e)| Sentence {
                    text: t.to_string(),
                    emotion: *e,
                })
                .collect(),
            style: ScriptStyle::Community,
            theme: "funny".into(),
            keywords: vec![],
            search_keywords: vec![],
            hashtags: vec![],
        }
    }

    fn long_clean_script() -> Script {
        script_with_emotions(&[
            ("True story, this one still gives me chills.", EmotionTag::Tension),
            ("A clerk noticed the same customer every single night.", EmotionTag::Neutral),
            ("He always bought one item and left without a word.", EmotionTag::Tension),
            ("One night the clerk followed him outside.", EmotionTag::Surprise),
            ("The man was feeding strays behind the store the whole time.", EmotionTag::Relief),
            ("The owner found out and started donating the expiring stock.", EmotionTag::Fun),
            ("Now half the neighborhood shows up to help on weekends.", EmotionTag::Neutral),
        ])
    }

    #[test]
    fn test_clean_script_passes() {
        let report = check_script_quality(&long_clean_script());
        assert!(report.passed(), "score {} issues {:?}", report.score, report.issues);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_short_script_deducts_twenty() {
        let report = check_script_quality(&script_from(&["Too short!"]));
        assert!(report.score <= 80);
        assert!(report.issues.iter().any(|i| i.contains("too short")));
    }

    #[test]
    fn test_filler_phrase_deducts() {
        let mut script = long_clean_script();
        script.sentences[6].text = "In conclusion, let's dive in together.".into();
        let report = check_script_quality(&script);
        // two filler phrases at -15 each
        assert!(report.score <= 70);
        assert!(!report.passed());
    }

    #[test]
    fn test_repeated_sentence_deducts() {
        let mut script = long_clean_script();
        let dup = script.sentences[1].text.clone();
        script.sentences[5].text = dup;
        let report = check_script_quality(&script);
        assert!(report.issues.iter().any(|i| i.contains("repeated")));
    }

    #[test]
    fn test_monotone_emotions_flagged() {
        let script = script_with_emotions(&[
            ("True story, you won't believe it.", EmotionTag::Neutral),
            ("It keeps one single flat tone throughout the piece.", EmotionTag::Neutral),
            ("Sentence three carries on in the very same register.", EmotionTag::Neutral),
            ("Sentence four is still completely flat and unchanging.", EmotionTag::Neutral),
            ("Sentence five rounds out a very long monotone stretch.", EmotionTag::Neutral),
        ]);
        let report = check_script_quality(&script);
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("consecutive sentences")));
    }

    #[test]
    fn test_misleading_guarantee_flagged() {
        let mut script = long_clean_script();
        script.sentences[3].text = "This trick is 100% guaranteed to work.".into();
        let report = check_script_quality(&script);
        assert!(report.issues.iter().any(|i| i.contains("misleading")));
    }

    #[test]
    fn test_factual_claims_found() {
        let script = script_from(&[
            "Studies show that 40% of people skip breakfast.",
            "Experts say it costs 3 times more than you think.",
        ]);
        let claims = check_factual_claims(&script);
        let kinds: Vec<_> = claims.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&"statistic"));
        assert!(kinds.contains(&"research citation"));
        assert!(kinds.contains(&"appeal to authority"));
    }

    #[test]
    fn test_no_claims_in_plain_story() {
        let claims = check_factual_claims(&long_clean_script());
        assert!(claims.is_empty());
    }
}
