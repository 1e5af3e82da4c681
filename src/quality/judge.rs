//! Optional AI deep-review of a draft, on top of the rule-based gate.
//!
//! A successful review blends into the reported quality score; a judge
//! failure never blocks production, it just logs.

use crate::error::{provider_error, ShortgenError, ShortgenResult};
use crate::script::Script;
use serde::Deserialize;
use tracing::info;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-sonnet-4-5";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default = "default_true")]
    pub monetization_safe: bool,
    #[serde(default)]
    pub originality_score: u8,
    #[serde(default)]
    pub engagement_score: u8,
    #[serde(default)]
    pub fact_accuracy: u8,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub overall_grade: String,
}

impl JudgeVerdict {
    /// Collapse the per-axis scores into one 0..=100 number.
    pub fn numeric_score(&self) -> u8 {
        let sum = self.originality_score as u16
            + self.engagement_score as u16
            + self.fact_accuracy as u16;
        (sum / 3).min(100) as u8
    }
}

fn default_true() -> bool {
    true
}

pub struct AiJudge {
    api_key: String,
}

impl AiJudge {
    /// Returns `None` when no credentials are configured; the caller just
    /// skips the deep review.
    pub fn from_env() -> Option<Self> {
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|api_key| Self { api_key })
    }

    pub fn review(&self, script: &Script) -> ShortgenResult<JudgeVerdict> {
        let prompt = build_judge_prompt(script);

        let body = serde_json::json!({
            "model": MODEL,
            "max_tokens": 1000,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = ureq::post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| provider_error("anthropic", e))?;

        let text = response.into_body().read_to_string().map_err(|e| {
            ShortgenError::Other(format!("failed to read judge response: {e}"))
        })?;

        let verdict = parse_judge_response(&text)?;
        info!(
            "AI review: grade {} (engagement {}, accuracy {})",
            verdict.overall_grade, verdict.engagement_score, verdict.fact_accuracy
        );
        Ok(verdict)
    }
}

fn build_judge_prompt(script: &Script) -> String {
    format!(
        "You review narration scripts for short-form video monetization.\n\
         Analyze the script below and reply with JSON only.\n\
         \n\
         Title: {title}\n\
         Script: {text}\n\
         \n\
         Reply exactly in this shape:\n\
         {{\"monetization_safe\": true, \"originality_score\": 80, \"engagement_score\": 75, \
         \"fact_accuracy\": 70, \"improvements\": [\"...\", \"...\", \"...\"], \
         \"risk_flags\": [], \"overall_grade\": \"B\"}}",
        title = script.title,
        text = script.full_text(),
    )
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

fn parse_judge_response(raw: &str) -> ShortgenResult<JudgeVerdict> {
    let parsed: MessagesResponse = serde_json::from_str(raw)
        .map_err(|e| ShortgenError::Other(format!("unexpected judge response: {e}")))?;

    let text = parsed
        .content
        .first()
        .map(|b| b.text.as_str())
        .unwrap_or_default();

    let inner = if let Some(start) = text.find("```json") {
        text[start + 7..].split("```").next().unwrap_or("")
    } else if let Some(start) = text.find("```") {
        text[start + 3..].split("```").next().unwrap_or("")
    } else {
        text
    };

    serde_json::from_str(inner.trim())
        .map_err(|e| ShortgenError::Other(format!("judge verdict is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_judge_response_plain() {
        let raw = r#"{"content": [{"type": "text", "text": "{\"monetization_safe\": true, \"originality_score\": 82, \"engagement_score\": 76, \"fact_accuracy\": 90, \"improvements\": [\"tighten the hook\"], \"risk_flags\": [], \"overall_grade\": \"B\"}"}]}"#;
        let verdict = parse_judge_response(raw).unwrap();
        assert!(verdict.monetization_safe);
        assert_eq!(verdict.originality_score, 82);
        assert_eq!(verdict.overall_grade, "B");
        assert_eq!(verdict.improvements.len(), 1);
    }

    #[test]
    fn test_parse_judge_response_fenced() {
        let raw = r#"{"content": [{"type": "text", "text": "Here:\n```json\n{\"overall_grade\": \"A\", \"risk_flags\": [\"gambling\"]}\n```"}]}"#;
        let verdict = parse_judge_response(raw).unwrap();
        assert_eq!(verdict.overall_grade, "A");
        assert_eq!(verdict.risk_flags, vec!["gambling"]);
        // missing fields fall back to defaults
        assert!(verdict.monetization_safe);
        assert_eq!(verdict.engagement_score, 0);
    }

    #[test]
    fn test_numeric_score_is_axis_mean() {
        let raw = r#"{"content": [{"type": "text", "text": "{\"originality_score\": 90, \"engagement_score\": 60, \"fact_accuracy\": 90}"}]}"#;
        let verdict = parse_judge_response(raw).unwrap();
        assert_eq!(verdict.numeric_score(), 80);
    }

    #[test]
    fn test_parse_judge_response_garbage() {
        assert!(parse_judge_response("nope").is_err());
        assert!(parse_judge_response(r#"{"content": [{"text": "not json"}]}"#).is_err());
    }
}
