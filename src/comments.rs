//! Per-post comment threads: live for discussion sources, synthetic otherwise.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::assets::AssetCatalog;
use crate::config::{Config, DiscussionConfig};
use crate::model::{Author, Category, Comment, PostId};
use crate::sources::hackernews::{fetch_item, fetch_items, HnItem};
use crate::sources::normalize::{clean_text, from_unix};
use crate::sources::reddit::Listing;
use crate::sources::{get_json, SourceError};
use crate::synthetic::synthetic_comments;

#[derive(Debug, Deserialize)]
struct RedditComment {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    ups: Option<i64>,
    #[serde(default)]
    created_utc: Option<f64>,
}

pub struct CommentFetcher {
    client: Client,
    discussion: DiscussionConfig,
    assets: Arc<AssetCatalog>,
    limit: usize,
}

impl CommentFetcher {
    pub fn new(
        client: Client,
        discussion: DiscussionConfig,
        assets: Arc<AssetCatalog>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            discussion,
            assets,
            limit,
        }
    }

    pub fn from_config(config: &Config, client: Client, assets: Arc<AssetCatalog>) -> Self {
        Self::new(client, config.discussion.clone(), assets, config.comment_limit)
    }

    /// Comments for `post_id`. Never fails: any problem with a live thread
    /// yields synthetic comments instead.
    pub async fn comments_for(&self, post_id: &str) -> Vec<Comment> {
        let Some(id) = PostId::parse(post_id) else {
            debug!("Post id '{}' not recognised, using synthetic comments", post_id);
            return self.synthetic(post_id, Category::General);
        };

        let live = match id.source.as_str() {
            "hn" => self.hacker_news(&id.native).await,
            "reddit" => self.reddit(&id.native).await,
            _ => return self.synthetic(post_id, id.category),
        };

        match live {
            Ok(comments) if !comments.is_empty() => comments,
            Ok(_) => {
                debug!("Thread for {} is empty, using synthetic comments", post_id);
                self.synthetic(post_id, id.category)
            }
            Err(e) => {
                debug!("Thread for {} unavailable ({}), using synthetic comments", post_id, e);
                self.synthetic(post_id, id.category)
            }
        }
    }

    fn synthetic(&self, post_id: &str, category: Category) -> Vec<Comment> {
        synthetic_comments(post_id, category, &self.assets, Utc::now())
    }

    async fn hacker_news(&self, native: &str) -> Result<Vec<Comment>, SourceError> {
        let story_id: u64 = native
            .parse()
            .map_err(|_| SourceError::Payload(format!("invalid Hacker News id '{}'", native)))?;
        let story = fetch_item(&self.client, &self.discussion.hacker_news, story_id).await?;
        let kids: Vec<u64> = story.kids.into_iter().take(self.limit).collect();
        let items = fetch_items(&self.client, &self.discussion.hacker_news, &kids).await;

        Ok(items
            .into_iter()
            .filter_map(|item| self.hn_comment(item))
            .collect())
    }

    fn hn_comment(&self, item: HnItem) -> Option<Comment> {
        let text = clean_text(item.text.as_deref()?);
        if text.is_empty() {
            return None;
        }
        let handle = item.by.unwrap_or_else(|| "anonymous".to_string());
        Some(Comment {
            id: format!("hn_comment_{}", item.id),
            author: Author {
                display_name: handle.clone(),
                avatar_url: self.assets.person_avatar(&handle),
                handle,
            },
            text,
            // The item API exposes no per-comment score
            like_count: rand::rng().random_range(0..50),
            published_at: item.time.and_then(from_unix).unwrap_or_else(Utc::now),
        })
    }

    async fn reddit(&self, native: &str) -> Result<Vec<Comment>, SourceError> {
        let url = format!(
            "{}/comments/{}.json",
            self.discussion.reddit.trim_end_matches('/'),
            native
        );
        let query = vec![("limit".to_string(), self.limit.to_string())];
        let (_, thread): (serde_json::Value, Listing<RedditComment>) =
            get_json(&self.client, &url, &query).await?;

        Ok(thread
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t1")
            .filter_map(|thing| {
                let c = thing.data;
                let text = clean_text(c.body.as_deref()?);
                let author = c.author.filter(|a| a != "[deleted]")?;
                if text.is_empty() || text == "[removed]" {
                    return None;
                }
                Some(Comment {
                    id: format!("reddit_comment_{}", c.id),
                    author: Author {
                        display_name: format!("u/{}", author),
                        avatar_url: self.assets.person_avatar(&author),
                        handle: author,
                    },
                    text,
                    like_count: c.ups.map(|ups| ups.max(0) as u64).unwrap_or_default(),
                    published_at: c
                        .created_utc
                        .and_then(|ts| from_unix(ts as i64))
                        .unwrap_or_else(Utc::now),
                })
            })
            .take(self.limit)
            .collect())
    }
}
