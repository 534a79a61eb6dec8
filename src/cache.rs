//! Process-local feed cache, injected into the aggregator.
//!
//! Each key holds the last stored batch and a generation counter. A refresh
//! reserves a generation before it fans out and may only store its result if
//! no newer refresh was started for the same key in the meantime.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::Post;

pub const MAIN_FEED: &str = "main";

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub posts: Vec<Post>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    latest_generation: u64,
}

#[derive(Debug, Default)]
pub struct FeedCache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let slots = self.slots.read().await;
        slots.get(key).and_then(|slot| slot.entry.clone())
    }

    /// Reserve the next generation for `key`. Later reservations supersede earlier ones.
    pub async fn begin_refresh(&self, key: &str) -> u64 {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(key.to_string()).or_default();
        slot.latest_generation += 1;
        slot.latest_generation
    }

    /// Store `entry` only if `generation` is still the newest reserved one.
    /// Returns whether the entry was stored.
    pub async fn store_if_current(&self, key: &str, generation: u64, entry: CacheEntry) -> bool {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(key.to_string()).or_default();
        if generation != slot.latest_generation {
            return false;
        }
        slot.entry = Some(entry);
        true
    }

    /// Apply `f` to the cached post with `post_id`, returning the updated copy.
    pub async fn update_post<F>(&self, key: &str, post_id: &str, f: F) -> Option<Post>
    where
        F: FnOnce(&mut Post),
    {
        let mut slots = self.slots.write().await;
        let post = slots
            .get_mut(key)?
            .entry
            .as_mut()?
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)?;
        f(post);
        Some(post.clone())
    }
}
