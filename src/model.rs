use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed content taxonomy used to group sources and filter the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    Sports,
    Crypto,
    Business,
    Entertainment,
    Health,
    Science,
    World,
    General,
    /// First-party, user-generated posts
    User,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Tech,
        Category::Sports,
        Category::Crypto,
        Category::Business,
        Category::Entertainment,
        Category::Health,
        Category::Science,
        Category::World,
        Category::General,
        Category::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Sports => "sports",
            Category::Crypto => "crypto",
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Science => "science",
            Category::World => "world",
            Category::General => "general",
            Category::User => "user",
        }
    }

    /// Body text used when an upstream record has no description.
    pub fn default_long_text(&self) -> &'static str {
        match self {
            Category::Tech => "Latest technology news and updates.",
            Category::Sports => "Latest sports news and match updates.",
            Category::Crypto => "Latest moves across the crypto markets.",
            Category::Business => "Latest business and markets coverage.",
            Category::Entertainment => "Latest from film, music and culture.",
            Category::Health => "Latest health and wellness news.",
            Category::Science => "Latest discoveries from the world of science.",
            Category::World => "Latest headlines from around the world.",
            Category::General => "No content available",
            Category::User => "No content available",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub display_name: String,
    pub handle: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub like_count: u64,
    pub comment_count: u64,
}

/// A normalized content item, whatever source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub long_text: String,
    pub media: Option<String>,
    pub engagement: Engagement,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub source_label: String,
    pub source_url: Option<String>,
    #[serde(default)]
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded form of a post id: `<source>_<category>_<native>_<index>_<millis>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId {
    pub source: String,
    pub category: Category,
    pub native: String,
    pub index: usize,
    pub fetched_millis: i64,
}

impl PostId {
    pub fn new(
        source: &str,
        category: Category,
        native: &str,
        index: usize,
        fetched_millis: i64,
    ) -> Self {
        Self {
            source: source.to_string(),
            category,
            native: sanitize_native_id(native),
            index,
            fetched_millis,
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        let mut head = id.splitn(3, '_');
        let source = head.next()?;
        let category = head.next()?.parse().ok()?;
        let rest = head.next()?;

        let mut tail = rest.rsplitn(3, '_');
        let fetched_millis = tail.next()?.parse().ok()?;
        let index = tail.next()?.parse().ok()?;
        let native = tail.next()?;

        if source.is_empty() || native.is_empty() {
            return None;
        }

        Some(Self {
            source: source.to_string(),
            category,
            native: native.to_string(),
            index,
            fetched_millis,
        })
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.source, self.category, self.native, self.index, self.fetched_millis
        )
    }
}

/// Keeps ids splittable: anything outside `[A-Za-z0-9-]` becomes `-`.
fn sanitize_native_id(native: &str) -> String {
    let cleaned: String = native
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned.chars().take(64).collect()
    }
}
