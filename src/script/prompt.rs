//! Prompt assembly for the script LLMs.
//!
//! Each request mixes a narrative style, a rotating structural template, and a
//! randomly chosen hook so back-to-back runs don't converge on one formula.

use crate::script::ScriptStyle;
use rand::seq::SliceRandom;
use rand::Rng;

pub struct StyleTemplate {
    pub tone: &'static str,
    pub structure: &'static str,
    pub persona: &'static str,
}

pub fn style_template(style: ScriptStyle) -> StyleTemplate {
    match style {
        ScriptStyle::Creative => StyleTemplate {
            tone: "fresh and original, leaning on metaphor and wit",
            structure: "setup, build, at least two reversals, payoff",
            persona: "a curious explorer",
        },
        ScriptStyle::Analytical => StyleTemplate {
            tone: "logical, data-first, genuinely insightful",
            structure: "problem, analysis, resolution, takeaway",
            persona: "a cool-headed analyst",
        },
        ScriptStyle::Emotional => StyleTemplate {
            tone: "empathetic and moving, story-driven",
            structure: "empathy, development, climax, lesson",
            persona: "a warm mentor",
        },
        ScriptStyle::Humorous => StyleTemplate {
            tone: "witty, playful comparisons",
            structure: "joke, reversal, core point, funny closer",
            persona: "a comedian who knows their stuff",
        },
        ScriptStyle::Expert => StyleTemplate {
            tone: "professional and trustworthy",
            structure: "claim, evidence, example, conclusion",
            persona: "a ten-year veteran of the field",
        },
        ScriptStyle::Community => StyleTemplate {
            tone: "vivid spoken retelling of a real post, casual interjections",
            structure: "bait, development, twist, aftermath",
            persona: "a narrator famous for retelling legendary forum threads",
        },
    }
}

/// Structural templates rotated per request so repeated runs vary in shape.
struct ScriptTemplate {
    name: &'static str,
    structure: &'static str,
    hook_style: &'static str,
    tone: &'static str,
}

const SCRIPT_TEMPLATES: [ScriptTemplate; 5] = [
    ScriptTemplate {
        name: "shock-twist",
        structure: "shocking opener, background, twist one, twist two, comment bait",
        hook_style: "lead with the most shocking outcome",
        tone: "spine-chilling, sustained tension",
    },
    ScriptTemplate {
        name: "shared-outrage",
        structure: "infuriating situation, escalating detail, resolution or lack of one, invite outrage",
        hook_style: "open mid-rant, like venting to a friend",
        tone: "righteous anger the viewer shares",
    },
    ScriptTemplate {
        name: "storytelling",
        structure: "introduce the person, incident, development, twist, epilogue",
        hook_style: "open on a character doing something",
        tone: "immersive narrative, concrete detail",
    },
    ScriptTemplate {
        name: "info-barrage",
        structure: "bait question, three rapid facts, the most shocking fact, call to action",
        hook_style: "open with 'you lose out if you don't know this'",
        tone: "fast pace, fact after fact, numbers emphasized",
    },
    ScriptTemplate {
        name: "versus",
        structure: "present A vs B, explain A, explain B, unexpected result, ask viewers to pick",
        hook_style: "open with 'A vs B, which wins?'",
        tone: "competitive framing, curiosity, upset endings",
    },
];

const UNIQUE_ANGLES: [&str; 8] = [
    "seen through a historical lens",
    "broken down psychologically",
    "explained with basic economics",
    "the part outsiders find unbelievable",
    "what the research actually shows",
    "what insiders know and never say",
    "the version you'll regret not knowing",
    "what the numbers quietly reveal",
];

const STORYTELLING_HOOKS: [&str; 6] = [
    "open with a personal anecdote",
    "open with a shocking statistic",
    "open with a question that flips expectations",
    "open with a metaphor",
    "open by connecting to recent news",
    "open with an everyday observation",
];

const COMMUNITY_HOOKS: [&str; 6] = [
    "True story. Brace yourself.",
    "This one's legendary and people still don't know it.",
    "Just read this and got actual chills.",
    "You will not sleep after hearing this.",
    "The whole forum lost its mind over this post.",
    "Am I the only one who gasped at this?",
];

/// Phrases the prompt forbids outright; the quality gate also scans for them.
pub const BANNED_PHRASES: [&str; 8] = [
    "in conclusion",
    "to sum up",
    "isn't that amazing",
    "let's dive in",
    "today we're going to",
    "leave a comment below",
    "what do you think",
    "hit that subscribe",
];

/// JSON shape the model is asked to emit. Kept in one place so the prompt and
/// the parser can't drift apart.
const OUTPUT_CONTRACT: &str = r##"Output JSON only, exactly this shape:
{
    "title": "curiosity-grabbing title, under 60 characters",
    "bg_theme": "one of: horror/funny/touching/shocking/mystery",
    "script": [
        {"text": "one short sentence", "emotion": "anger/fun/surprise/neutral/sad/tension/relief/shock"}
    ],
    "keywords": ["emphasis keyword 1", "emphasis keyword 2", "emphasis keyword 3"],
    "search_keywords": ["english stock-footage query 1", "query 2", "query 3", "query 4"],
    "hashtags": ["#shorts", "#story", "..."]
}
The script array must hold 15-25 entries. Never repeat the same emotion more than twice in a row."##;

/// Prompt for the general styles (everything except community retells).
pub fn build_prompt(
    topic: &str,
    style: ScriptStyle,
    target_secs: f64,
    rng: &mut impl Rng,
) -> String {
    let config = style_template(style);
    let template = &SCRIPT_TEMPLATES[rng.gen_range(0..SCRIPT_TEMPLATES.len())];
    let angle = UNIQUE_ANGLES.choose(rng).copied().unwrap_or(UNIQUE_ANGLES[0]);
    let hook = STORYTELLING_HOOKS
        .choose(rng)
        .copied()
        .unwrap_or(STORYTELLING_HOOKS[0]);
    let (min_chars, max_chars) = random_length(rng, target_secs);
    let cap_secs = target_secs.floor().max(20.0) as usize;

    format!(
        "You write narration scripts for vertical short-form videos.\n\
         \n\
         Topic: {topic}\n\
         Unique angle: {angle}\n\
         Opening: {hook}\n\
         Tone: {tone}\n\
         Structure: {structure}\n\
         Persona: {persona}\n\
         \n\
         This script's shape ({tname}): {tstructure}\n\
         Hook style: {thook}\n\
         Delivery: {ttone}\n\
         \n\
         Hard rules:\n\
         - Every sentence at most 12 words; split anything longer.\n\
         - {min_chars} to {max_chars} characters total; reads aloud in under {cap_secs} seconds.\n\
         - Include your own take, not just facts.\n\
         - Never invent statistics or facts about real people.\n\
         - No markdown, no bold, no stage directions.\n\
         - Never use any of these phrases: {banned}.\n\
         \n\
         {contract}",
        topic = topic,
        angle = angle,
        hook = hook,
        tone = config.tone,
        structure = config.structure,
        persona = config.persona,
        tname = template.name,
        tstructure = template.structure,
        thook = template.hook_style,
        ttone = template.tone,
        min_chars = min_chars,
        max_chars = max_chars,
        cap_secs = cap_secs,
        banned = BANNED_PHRASES.join(", "),
        contract = OUTPUT_CONTRACT,
    )
}

/// Prompt for retelling a crawled community post. With a source post the
/// model narrates it; without one it invents a forum-style story instead.
pub fn build_community_prompt(
    topic: &str,
    source_text: &str,
    target_secs: f64,
    rng: &mut impl Rng,
) -> String {
    let hook = COMMUNITY_HOOKS
        .choose(rng)
        .copied()
        .unwrap_or(COMMUNITY_HOOKS[0]);
    let (min_chars, max_chars) = random_length(rng, target_secs);

    let (retell_rules, source_section) = if source_text.is_empty() {
        (
            "- Tell one believable forum-style story about the topic in casual spoken style.\n"
                .to_string(),
            String::new(),
        )
    } else {
        let clipped: String = source_text.chars().take(2000).collect();
        (
            "- Retell the [Source post] below in casual spoken style. Never invent events.\n\
             - Cover at least 80% of the facts in the source.\n"
                .to_string(),
            format!("[Source post]\n{clipped}\n\n"),
        )
    };

    format!(
        "You narrate viral forum posts for vertical short-form videos.\n\
         \n\
         Rules:\n\
         {retell_rules}\
         - Open with: \"{hook}\"\n\
         - Every sentence at most 12 words.\n\
         - {min_chars} to {max_chars} characters total.\n\
         - Replace any personal names with roles (the guy, the owner, the clerk).\n\
         - No markdown, no bold. Never invent statistics.\n\
         - Never use any of these phrases: {banned}.\n\
         \n\
         {source_section}Topic: {topic}\n\
         \n\
         {contract}",
        retell_rules = retell_rules,
        hook = hook,
        min_chars = min_chars,
        max_chars = max_chars,
        banned = BANNED_PHRASES.join(", "),
        source_section = source_section,
        topic = topic,
        contract = OUTPUT_CONTRACT,
    )
}

/// Target length varies run to run so output durations don't cluster, while
/// the upper bound never asks for more narration than the final video can
/// hold. Spoken pace runs roughly 13-17 characters per second.
fn random_length(rng: &mut impl Rng, target_secs: f64) -> (usize, usize) {
    let max_secs = (target_secs.floor() as usize).clamp(20, 90);
    let min_secs = (max_secs * 3 / 4).max(15);
    let duration = rng.gen_range(min_secs..=max_secs);
    (duration * 13, duration * 17)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_prompt_mentions_topic_and_contract() {
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = build_prompt(
            "why cats knock things over",
            ScriptStyle::Humorous,
            59.0,
            &mut rng,
        );
        assert!(prompt.contains("why cats knock things over"));
        assert!(prompt.contains("Output JSON only"));
        assert!(prompt.contains("bg_theme"));
        // the hashtag example must survive into the contract verbatim
        assert!(prompt.contains("\"#shorts\""));
    }

    #[test]
    fn test_community_prompt_clips_long_source() {
        let mut rng = StdRng::seed_from_u64(7);
        let source = "x".repeat(5000);
        let prompt = build_community_prompt("a wild story", &source, 59.0, &mut rng);
        // only the first 2000 chars of the source survive
        assert!(!prompt.contains(&"x".repeat(2001)));
        assert!(prompt.contains(&"x".repeat(2000)));
        assert!(prompt.contains("[Source post]"));
        assert!(prompt.contains("Retell the [Source post]"));
    }

    #[test]
    fn test_community_prompt_without_source_omits_section() {
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = build_community_prompt("a wild story", "", 59.0, &mut rng);
        assert!(!prompt.contains("[Source post]"));
        assert!(!prompt.contains("Retell the"));
        assert!(prompt.contains("forum-style story"));
    }

    #[test]
    fn test_random_length_bounded_by_target_duration() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let (min, max) = random_length(&mut rng, 59.0);
            assert!(min < max);
            assert!(min >= 44 * 13);
            assert!(max <= 59 * 17);
        }
        // a tiny target still yields a sane range
        let (min, max) = random_length(&mut rng, 5.0);
        assert!(min >= 15 * 13);
        assert!(max <= 20 * 17);
    }
}
