use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::model::Category;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Maximum age of the cached feed, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of posts returned by a feed load
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    #[serde(default)]
    pub ordering: FeedOrdering,
    /// Background refresh interval in minutes, 0 disables it
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Live comments fetched per discussion thread
    #[serde(default = "default_comment_limit")]
    pub comment_limit: usize,
    #[serde(default)]
    pub discussion: DiscussionConfig,
    /// Per-category caps, keyed by category name
    #[serde(default)]
    pub category_limits: HashMap<String, usize>,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_feed_limit() -> usize {
    50
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_comment_limit() -> usize {
    10
}

pub const DEFAULT_CATEGORY_LIMIT: usize = 15;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrdering {
    #[default]
    Newest,
    Shuffled,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    NewsApi,
    Gnews,
    RssBridge,
    Rss,
    HackerNews,
    Reddit,
    CoinGecko,
}

impl SourceKind {
    /// Leading segment of every post id produced by this kind of source.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            SourceKind::NewsApi => "newsapi",
            SourceKind::Gnews => "gnews",
            SourceKind::RssBridge => "rss2json",
            SourceKind::Rss => "rss",
            SourceKind::HackerNews => "hn",
            SourceKind::Reddit => "reddit",
            SourceKind::CoinGecko => "coingecko",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub category: Category,
    pub url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Extra fixed query parameters sent with every request
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscussionConfig {
    #[serde(default = "default_hacker_news_url")]
    pub hacker_news: String,
    #[serde(default = "default_reddit_url")]
    pub reddit: String,
}

fn default_hacker_news_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_reddit_url() -> String {
    "https://www.reddit.com".to_string()
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            hacker_news: default_hacker_news_url(),
            reddit: default_reddit_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetConfig {
    #[serde(default = "default_avatar")]
    pub default_avatar: String,
    /// Placeholder image URL template, `{seed}` is substituted
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
    /// Default avatar keyed by source name or category name
    #[serde(default)]
    pub avatars: HashMap<String, String>,
}

fn default_avatar() -> String {
    "https://i.pravatar.cc/150?img=0".to_string()
}

fn default_placeholder_image() -> String {
    "https://picsum.photos/seed/{seed}/600/400".to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            default_avatar: default_avatar(),
            placeholder_image: default_placeholder_image(),
            avatars: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.feed_limit == 0 {
            anyhow::bail!("feed_limit must be positive");
        }
        for key in self.category_limits.keys() {
            key.parse::<Category>()?;
        }
        for source in &self.sources {
            if source.category == Category::User {
                anyhow::bail!(
                    "source '{}' cannot use the user category, it is reserved for first-party posts",
                    source.name
                );
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn category_limit(&self, category: Category) -> usize {
        self.category_limits
            .get(category.as_str())
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_LIMIT)
    }

    /// Categories that have at least one source, in first-configured order.
    pub fn active_categories(&self) -> Vec<Category> {
        let mut categories = Vec::new();
        for source in &self.sources {
            if !categories.contains(&source.category) {
                categories.push(source.category);
            }
        }
        categories
    }
}
