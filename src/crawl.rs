//! Community post crawling and topic selection.
//!
//! Pulls hot posts from story communities, scores them for short-form fit,
//! and remembers which posts were already used so back-to-back runs don't
//! retell the same thread. Every network source is best-effort: a dead source
//! is skipped, and when everything fails a static topic pool backs us up.

use crate::error::{ShortgenError, ShortgenResult};
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const USER_AGENT: &str = "shortgen/0.1 (content research)";

/// Topics used when every crawl source fails.
pub const FALLBACK_TOPICS: [&str; 10] = [
    "the worst customer a night-shift clerk ever served",
    "the one thing you should never say on a first date",
    "what happened after I finally talked back to my boss",
    "the creepiest thing that happened living alone",
    "a package arrived that wasn't mine, so I opened it",
    "the most legendary thing that happened in basic training",
    "my roommate's habit that nearly drove me out",
    "how I almost fell for a marketplace scam",
    "the wildest question an interviewer ever asked me",
    "the night shift at a convenience store gets weird",
];

// Signals a post will hold attention in a 60-second retell.
const HOOK_KEYWORDS: [&str; 16] = [
    "insane",
    "unbelievable",
    "shocking",
    "legendary",
    "twist",
    "exposed",
    "revenge",
    "caught",
    "secret",
    "regret",
    "fired",
    "wedding",
    "landlord",
    "scam",
    "confession",
    "turns out",
];

const STORY_INDICATORS: [&str; 6] = [
    "so i",
    "and then",
    "turns out",
    "in the end",
    "but then",
    "long story",
];

// Instant disqualifiers: topics that can't be monetized or retold responsibly.
const BLOCKED_KEYWORDS: [&str; 7] = [
    "politics",
    "election",
    "suicide",
    "self-harm",
    "assault",
    "overdose",
    "minor ",
];

#[derive(Debug, Clone)]
pub struct CommunityPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source: String,
    pub score: i32,
}

/// What the pipeline actually runs on: a topic, optionally backed by a source
/// post to retell.
#[derive(Debug, Clone)]
pub struct TopicSelection {
    pub title: String,
    pub body: String,
    pub source: String,
}

/// Score a post for short-form suitability. Higher is better; anything at or
/// below zero is dropped.
pub fn score_post(title: &str, body: &str) -> i32 {
    let title_lower = title.to_lowercase();
    let body_lower = body.to_lowercase();
    let mut score = 0;

    for word in HOOK_KEYWORDS {
        if title_lower.contains(word) {
            score += 3;
        }
        if body_lower.contains(word) {
            score += 1;
        }
    }

    for word in STORY_INDICATORS {
        if body_lower.contains(word) {
            score += 2;
        }
    }

    let body_len = body.chars().count();
    if (100..=2000).contains(&body_len) {
        score += 5;
    } else if body_len < 50 {
        score -= 10;
    }

    for word in BLOCKED_KEYWORDS {
        if title_lower.contains(word) || body_lower.contains(word) {
            score -= 100;
        }
    }

    score
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: ListedPost,
}

#[derive(Deserialize)]
struct ListedPost {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    over_18: bool,
}

pub struct Crawler {
    used_posts_path: PathBuf,
    used_ids: HashSet<String>,
    communities: Vec<String>,
}

impl Crawler {
    pub fn new(used_posts_path: &Path, communities: Vec<String>) -> ShortgenResult<Self> {
        let used_ids = load_used_ids(used_posts_path)?;
        Ok(Self {
            used_posts_path: used_posts_path.to_path_buf(),
            used_ids,
            communities,
        })
    }

    /// Fetch, score, and return the top `count` unused posts, best first.
    /// Falls back to the static pool when nothing usable comes back.
    pub fn pick_best(&mut self, count: usize) -> Vec<CommunityPost> {
        let mut posts = self.fetch_all();
        posts.retain(|p| p.score > 0 && !self.used_ids.contains(&p.id));
        posts.sort_by(|a, b| b.score.cmp(&a.score));
        posts.truncate(count);

        if posts.is_empty() {
            warn!("no usable crawled posts, using fallback topic pool");
            return fallback_posts(count);
        }

        for post in &posts {
            self.used_ids.insert(post.id.clone());
        }
        if let Err(e) = save_used_ids(&self.used_posts_path, &self.used_ids) {
            warn!("failed to persist used-post ledger: {e}");
        }

        posts
    }

    fn fetch_all(&self) -> Vec<CommunityPost> {
        let mut posts = Vec::new();

        for community in &self.communities {
            match self.fetch_community(community) {
                Ok(fetched) => {
                    info!("crawled {}: {} posts", community, fetched.len());
                    posts.extend(fetched);
                }
                Err(e) => {
                    debug!("crawl source {community} failed: {e}");
                }
            }
        }

        // de-dup by title across sources
        let mut seen = HashSet::new();
        posts.retain(|p| seen.insert(p.title.clone()));
        posts
    }

    fn fetch_community(&self, community: &str) -> ShortgenResult<Vec<CommunityPost>> {
        let url = format!("https://www.reddit.com/r/{community}/hot.json?limit=25");

        let response = ureq::get(&url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| ShortgenError::Crawl(format!("listing fetch failed: {e}")))?;

        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| ShortgenError::Crawl(format!("failed to read listing: {e}")))?;

        let listing: Listing = serde_json::from_str(&text)
            .map_err(|e| ShortgenError::Crawl(format!("unexpected listing shape: {e}")))?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|c| c.data)
            .filter(|p| !p.over_18 && p.title.chars().count() >= 5)
            .map(|p| {
                let score = score_post(&p.title, &p.selftext);
                CommunityPost {
                    id: p.id,
                    title: clean_title(&p.title),
                    body: p.selftext,
                    source: community.to_string(),
                    score,
                }
            })
            .collect())
    }
}

/// Pick a topic for a production run: a user override wins, then the best
/// crawled post, then the fallback pool.
pub fn select_topic(crawler: &mut Crawler, topic_override: Option<&str>) -> TopicSelection {
    if let Some(topic) = topic_override {
        info!("using user-supplied topic: {topic}");
        return TopicSelection {
            title: topic.to_string(),
            body: String::new(),
            source: "manual".into(),
        };
    }

    let best = crawler.pick_best(1);
    let post = &best[0];
    info!("selected topic '{}' (source: {}, score: {})", post.title, post.source, post.score);
    TopicSelection {
        title: post.title.clone(),
        body: post.body.clone(),
        source: post.source.clone(),
    }
}

/// Current trending queries from the public trends RSS feed. Best-effort;
/// returns an empty list on any failure.
pub fn fetch_trending_topics() -> Vec<String> {
    let url = "https://trends.google.com/trending/rss?geo=US";

    let response = match ureq::get(url).header("User-Agent", USER_AGENT).call() {
        Ok(r) => r,
        Err(e) => {
            debug!("trends fetch failed: {e}");
            return Vec::new();
        }
    };

    match response.into_body().read_to_string() {
        Ok(xml) => parse_rss_titles(&xml),
        Err(e) => {
            debug!("trends read failed: {e}");
            Vec::new()
        }
    }
}

/// Pull `<title>` texts out of an RSS feed, skipping the channel's own title.
fn parse_rss_titles(xml: &str) -> Vec<String> {
    let pattern = Regex::new(r"<title>(?:<!\[CDATA\[)?([^<\]]+)(?:\]\]>)?</title>")
        .expect("static regex");

    pattern
        .captures_iter(xml)
        .skip(1) // channel title
        .map(|c| c[1].trim().replace("&amp;", "&"))
        .filter(|t| t.chars().count() >= 2)
        .take(20)
        .collect()
}

/// Strip leading category tags like "[Update]".
fn clean_title(title: &str) -> String {
    static ONCE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let pattern = ONCE.get_or_init(|| Regex::new(r"^\[.*?\]\s*").expect("static regex"));
    pattern.replace(title.trim(), "").to_string()
}

fn fallback_posts(count: usize) -> Vec<CommunityPost> {
    let mut rng = rand::thread_rng();
    let mut topics: Vec<&str> = FALLBACK_TOPICS.to_vec();
    topics.shuffle(&mut rng);
    topics
        .into_iter()
        .take(count.max(1))
        .map(|t| CommunityPost {
            id: format!("fallback:{t}"),
            title: t.to_string(),
            body: String::new(),
            source: "fallback".into(),
            score: 0,
        })
        .collect()
}

fn load_used_ids(path: &Path) -> ShortgenResult<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let data = std::fs::read_to_string(path)?;
    let ids: Vec<String> = serde_json::from_str(&data)
        .map_err(|e| ShortgenError::Crawl(format!("used-post ledger is corrupt: {e}")))?;
    Ok(ids.into_iter().collect())
}

fn save_used_ids(path: &Path, ids: &HashSet<String>) -> ShortgenResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();
    let data = serde_json::to_string_pretty(&sorted)
        .map_err(|e| ShortgenError::Crawl(format!("failed to serialize ledger: {e}")))?;
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_rewards_hooks_and_story() {
        let score = score_post(
            "The twist that got my landlord exposed",
            "So I moved in last spring and everything seemed fine. \
             But then the heating died and the landlord went silent. \
             Turns out he never owned the building. In the end the real \
             owner showed up with the police and the whole thing unraveled.",
        );
        assert!(score > 10, "got {score}");
    }

    #[test]
    fn test_score_blocks_unsafe_topics() {
        let score = score_post(
            "Election politics thread",
            "a long enough body that would otherwise score fine with a twist and turns out moments all over the place, easily past the length bonus threshold for sure",
        );
        assert!(score < 0, "got {score}");
    }

    #[test]
    fn test_score_penalizes_empty_body() {
        assert!(score_post("just a title", "") < 0);
    }

    #[test]
    fn test_clean_title_strips_tags() {
        assert_eq!(clean_title("[Update] The saga continues"), "The saga continues");
        assert_eq!(clean_title("No tag here"), "No tag here");
    }

    #[test]
    fn test_parse_rss_titles_skips_channel() {
        let xml = r#"<rss><channel>
            <title>Daily Trends</title>
            <item><title>first topic</title></item>
            <item><title><![CDATA[second topic]]></title></item>
            <item><title>a</title></item>
        </channel></rss>"#;
        let titles = parse_rss_titles(xml);
        assert_eq!(titles, vec!["first topic", "second topic"]);
    }

    #[test]
    fn test_used_ids_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("used_posts.json");

        let mut ids = HashSet::new();
        ids.insert("abc".to_string());
        ids.insert("def".to_string());
        save_used_ids(&path, &ids).unwrap();

        let loaded = load_used_ids(&path).unwrap();
        assert_eq!(loaded, ids);
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ids = load_used_ids(&dir.path().join("nope.json")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_fallback_posts_never_empty() {
        let posts = fallback_posts(3);
        assert_eq!(posts.len(), 3);
        assert!(posts.iter().all(|p| p.source == "fallback"));
    }

    #[test]
    fn test_listing_parse() {
        let json = r#"{"data": {"children": [
            {"data": {"id": "x1", "title": "A long enough title", "selftext": "body text", "over_18": false}},
            {"data": {"id": "x2", "title": "NSFW thing here", "selftext": "", "over_18": true}}
        ]}}"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 2);
        assert!(listing.data.children[1].data.over_18);
    }
}
