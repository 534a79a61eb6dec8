use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::normalize::from_unix;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

pub(crate) const REDDIT_WEB: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
struct Link {
    id: String,
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    author: Option<String>,
    subreddit_name_prefixed: Option<String>,
    ups: Option<i64>,
    num_comments: Option<u64>,
    created_utc: Option<f64>,
    permalink: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    preview: Option<Preview>,
}

#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize)]
struct PreviewImage {
    source: PreviewSource,
}

#[derive(Debug, Deserialize)]
struct PreviewSource {
    url: String,
}

impl Link {
    fn image(&self) -> Option<String> {
        self.preview
            .as_ref()
            .and_then(|p| p.images.first())
            .map(|img| html_escape::decode_html_entities(&img.source.url).to_string())
            .or_else(|| self.thumbnail.clone().filter(|t| t.starts_with("http")))
    }
}

/// Social-discussion source: a subreddit's hot listing.
pub struct RedditSource {
    client: Client,
    ctx: SourceContext,
}

impl RedditSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for RedditSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let query = self.ctx.query(&[("limit", self.ctx.config.page_size.to_string())]);
        let listing: Listing<Link> = get_json(&self.client, &self.ctx.config.url, &query).await?;

        let fetched_at = Utc::now();
        let posts = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t3")
            .take(self.ctx.config.page_size)
            .enumerate()
            .map(|(index, thing)| {
                let link = thing.data;
                let image = link.image();
                let raw = RawItem {
                    native_id: Some(link.id.clone()),
                    title: link.title,
                    body: link.selftext.filter(|s| !s.trim().is_empty()),
                    byline: link.author.as_ref().map(|a| format!("u/{}", a)),
                    handle: link.author,
                    outlet: link.subreddit_name_prefixed,
                    image,
                    likes: link.ups.map(|ups| ups.max(0) as u64),
                    comments: link.num_comments,
                    published: link.created_utc.and_then(|ts| from_unix(ts as i64)),
                    url: link.permalink.map(|p| format!("{}{}", REDDIT_WEB, p)),
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}
