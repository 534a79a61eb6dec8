use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rand::seq::SliceRandom;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::assets::AssetCatalog;
use crate::cache::{CacheEntry, FeedCache, MAIN_FEED};
use crate::config::{Config, FeedOrdering};
use crate::engagement::{self, ViewerLikes};
use crate::fallback::fallback_posts;
use crate::model::{Category, Post, PostId};
use crate::sources::{build_adapter, SourceAdapter};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("no content sources are configured")]
    NoSources,
    #[error("none of {sources} sources across {categories} categories returned posts")]
    NoPosts { sources: usize, categories: usize },
}

/// What a feed load produced, and where it came from.
#[derive(Debug, Clone)]
pub enum FeedOutcome {
    /// Fresh fan-out result
    Live(Vec<Post>),
    /// Served from cache inside the TTL window
    Cached { posts: Vec<Post>, age: Duration },
    /// Fan-out failed, previous cache entry served instead
    Stale { posts: Vec<Post>, reason: FeedError },
    /// Fan-out failed with nothing cached, hard-coded posts served
    Fallback { posts: Vec<Post>, reason: FeedError },
}

impl FeedOutcome {
    pub fn posts(&self) -> &[Post] {
        match self {
            FeedOutcome::Live(posts)
            | FeedOutcome::Cached { posts, .. }
            | FeedOutcome::Stale { posts, .. }
            | FeedOutcome::Fallback { posts, .. } => posts,
        }
    }

    pub fn into_posts(self) -> Vec<Post> {
        match self {
            FeedOutcome::Live(posts)
            | FeedOutcome::Cached { posts, .. }
            | FeedOutcome::Stale { posts, .. }
            | FeedOutcome::Fallback { posts, .. } => posts,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            FeedOutcome::Live(_) => "live",
            FeedOutcome::Cached { .. } => "cached",
            FeedOutcome::Stale { .. } => "stale",
            FeedOutcome::Fallback { .. } => "fallback",
        }
    }

    pub fn reason(&self) -> Option<&FeedError> {
        match self {
            FeedOutcome::Stale { reason, .. } | FeedOutcome::Fallback { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }

    /// Non-blocking message for the viewer when the feed is degraded.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            FeedOutcome::Stale { .. } => Some("Showing saved posts - live sources are unavailable"),
            FeedOutcome::Fallback { .. } => Some("Using demo data - live sources are unavailable"),
            _ => None,
        }
    }
}

/// All sources registered for one category.
pub struct CategoryAggregator {
    category: Category,
    max_items: usize,
    sources: Vec<Box<dyn SourceAdapter>>,
}

impl CategoryAggregator {
    pub fn new(category: Category, max_items: usize, sources: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self {
            category,
            max_items,
            sources,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run every source concurrently and wait for all of them; failed sources
    /// contribute nothing.
    pub async fn collect(&self) -> Vec<Post> {
        let batches = join_all(self.sources.iter().map(|source| source.collect())).await;
        let mut posts: Vec<Post> = batches.into_iter().flatten().collect();
        sort_newest_first(&mut posts);
        posts.truncate(self.max_items);
        info!(
            "Category '{}' collected {} posts from {} sources",
            self.category,
            posts.len(),
            self.sources.len()
        );
        posts
    }
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub cache_ttl: Duration,
    pub limit: usize,
    pub ordering: FeedOrdering,
    pub cache_key: String,
}

impl FeedSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            limit: config.feed_limit,
            ordering: config.ordering,
            cache_key: MAIN_FEED.to_string(),
        }
    }
}

pub struct FeedAggregator {
    categories: Vec<CategoryAggregator>,
    cache: Arc<FeedCache>,
    assets: Arc<AssetCatalog>,
    settings: FeedSettings,
    likes: Mutex<ViewerLikes>,
}

impl FeedAggregator {
    pub fn new(
        categories: Vec<CategoryAggregator>,
        cache: Arc<FeedCache>,
        assets: Arc<AssetCatalog>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            categories,
            cache,
            assets,
            settings,
            likes: Mutex::new(ViewerLikes::new()),
        }
    }

    pub fn from_config(
        config: &Config,
        client: Client,
        cache: Arc<FeedCache>,
        assets: Arc<AssetCatalog>,
    ) -> Self {
        let categories = config
            .active_categories()
            .into_iter()
            .map(|category| {
                let sources = config
                    .sources
                    .iter()
                    .filter(|s| s.category == category)
                    .map(|s| build_adapter(s, client.clone(), assets.clone()))
                    .collect();
                CategoryAggregator::new(category, config.category_limit(category), sources)
            })
            .collect();

        Self::new(categories, cache, assets, FeedSettings::from_config(config))
    }

    pub fn cache(&self) -> &Arc<FeedCache> {
        &self.cache
    }

    pub async fn load(&self, force_refresh: bool) -> FeedOutcome {
        let key = self.settings.cache_key.as_str();

        if !force_refresh {
            if let Some(entry) = self.cache.get(key).await {
                let now = Utc::now();
                if entry.is_fresh(now, self.settings.cache_ttl) {
                    let age = entry.age(now);
                    info!("Serving {} cached posts ({}s old)", entry.posts.len(), age.as_secs());
                    return FeedOutcome::Cached {
                        posts: entry.posts,
                        age,
                    };
                }
            }
        }

        let generation = self.cache.begin_refresh(key).await;
        info!(
            "Refreshing feed across {} categories (generation {})",
            self.categories.len(),
            generation
        );

        match self.fan_out().await {
            Ok(posts) => {
                let entry = CacheEntry {
                    posts: posts.clone(),
                    fetched_at: Utc::now(),
                };
                if !self.cache.store_if_current(key, generation, entry).await {
                    info!("Refresh generation {} superseded, not caching its result", generation);
                }
                info!("Feed refresh complete with {} posts", posts.len());
                FeedOutcome::Live(posts)
            }
            Err(reason) => match self.cache.get(key).await {
                Some(entry) => {
                    warn!("Feed refresh failed ({}), serving stale cache", reason);
                    FeedOutcome::Stale {
                        posts: entry.posts,
                        reason,
                    }
                }
                None => {
                    warn!("Feed refresh failed ({}), serving fallback posts", reason);
                    let posts = self.fallback().await;
                    FeedOutcome::Fallback { posts, reason }
                }
            },
        }
    }

    fn fallback_key(&self) -> String {
        format!("{}:fallback", self.settings.cache_key)
    }

    /// The fallback set is generated once and kept under its own key, so its
    /// ids stay stable and viewer engagement on it sticks.
    async fn fallback(&self) -> Vec<Post> {
        let key = self.fallback_key();
        if let Some(entry) = self.cache.get(&key).await {
            return entry.posts;
        }

        let mut posts = fallback_posts(&self.assets, Utc::now());
        posts.truncate(self.settings.limit);
        let generation = self.cache.begin_refresh(&key).await;
        let entry = CacheEntry {
            posts: posts.clone(),
            fetched_at: Utc::now(),
        };
        self.cache.store_if_current(&key, generation, entry).await;
        posts
    }

    /// Flip `viewer`'s like on a post in the current feed and move the shared
    /// counter with it. `None` if the post is not in the live or fallback set.
    pub async fn toggle_like(&self, viewer: &str, post_id: &str) -> Option<Post> {
        let mut likes = self.likes.lock().await;
        let liked = !likes.is_liked(viewer, post_id);
        let mut post = self
            .update_post(post_id, move |p| engagement::apply_like(p, liked))
            .await?;
        likes.set(viewer, post_id, liked);
        post.liked_by_viewer = liked;
        Some(post)
    }

    pub async fn record_comment(&self, post_id: &str) -> Option<Post> {
        self.update_post(post_id, engagement::record_comment).await
    }

    /// Stamp `liked_by_viewer` for `viewer` onto posts served from this feed.
    pub async fn mark_liked(&self, viewer: &str, posts: &mut [Post]) {
        self.likes.lock().await.mark(viewer, posts);
    }

    async fn update_post<F>(&self, post_id: &str, f: F) -> Option<Post>
    where
        F: Fn(&mut Post) + Copy,
    {
        match self.cache.update_post(&self.settings.cache_key, post_id, f).await {
            Some(post) => Some(post),
            None => self.cache.update_post(&self.fallback_key(), post_id, f).await,
        }
    }

    async fn fan_out(&self) -> Result<Vec<Post>, FeedError> {
        if self.categories.is_empty() {
            return Err(FeedError::NoSources);
        }

        let batches = join_all(self.categories.iter().map(|c| c.collect())).await;
        let mut posts: Vec<Post> = batches.into_iter().flatten().collect();

        if posts.is_empty() {
            return Err(FeedError::NoPosts {
                sources: self.categories.iter().map(|c| c.source_count()).sum(),
                categories: self.categories.len(),
            });
        }

        disambiguate_ids(&mut posts);
        order_posts(&mut posts, self.settings.ordering);
        posts.truncate(self.settings.limit);
        Ok(posts)
    }
}

pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

pub fn order_posts(posts: &mut [Post], ordering: FeedOrdering) {
    match ordering {
        FeedOrdering::Newest => sort_newest_first(posts),
        FeedOrdering::Shuffled => posts.shuffle(&mut rand::rng()),
    }
}

/// Two sources of the same kind in one category can emit the same id for the
/// same story; later copies get their index segment bumped until unique.
fn disambiguate_ids(posts: &mut [Post]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(posts.len());
    for post in posts.iter_mut() {
        if seen.insert(post.id.clone()) {
            continue;
        }
        if let Some(mut id) = PostId::parse(&post.id) {
            while seen.contains(&id.to_string()) {
                id.index += 1000;
            }
            post.id = id.to_string();
        } else {
            let mut n = 2;
            while seen.contains(&format!("{}-{}", post.id, n)) {
                n += 1;
            }
            post.id = format!("{}-{}", post.id, n);
        }
        seen.insert(post.id.clone());
    }
}

/// Keep the cache warm: one forced refresh now, then every `interval_minutes`.
pub async fn start_background_refresh(aggregator: Arc<FeedAggregator>, interval_minutes: u64) {
    if interval_minutes == 0 {
        info!("Background refresh disabled");
        return;
    }
    let interval = Duration::from_secs(interval_minutes * 60);

    info!("Starting initial feed fetch");
    let outcome = aggregator.load(true).await;
    if let Some(reason) = outcome.reason() {
        error!("Initial feed fetch degraded: {}", reason);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled feed refresh");
        let outcome = aggregator.load(true).await;
        if let Some(reason) = outcome.reason() {
            error!("Scheduled feed refresh degraded: {}", reason);
        }
    }
}
