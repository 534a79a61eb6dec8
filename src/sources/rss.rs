use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use serde::Deserialize;

use super::normalize::parse_rfc3339;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    feed: Option<BridgeFeed>,
    #[serde(default)]
    items: Vec<BridgeItem>,
}

#[derive(Debug, Deserialize)]
struct BridgeFeed {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeItem {
    title: Option<String>,
    pub_date: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    author: Option<String>,
    thumbnail: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    link: Option<String>,
}

/// rss2json emits `YYYY-MM-DD HH:MM:SS` in UTC.
fn parse_bridge_date(ts: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(ts.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| parse_rfc3339(ts))
}

/// A publisher feed read through an RSS-to-JSON bridge.
pub struct RssBridgeSource {
    client: Client,
    ctx: SourceContext,
}

impl RssBridgeSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for RssBridgeSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let mut extra = vec![("count", self.ctx.config.page_size.to_string())];
        if let Some(key) = &self.ctx.config.api_key {
            extra.push(("api_key", key.clone()));
        }
        let query = self.ctx.query(&extra);
        let response: BridgeResponse =
            get_json(&self.client, &self.ctx.config.url, &query).await?;

        if response.status != "ok" {
            return Err(SourceError::Payload(
                response
                    .message
                    .unwrap_or_else(|| format!("status '{}'", response.status)),
            ));
        }

        let outlet = response.feed.and_then(|f| f.title);
        let fetched_at = Utc::now();
        let posts = response
            .items
            .into_iter()
            .take(self.ctx.config.page_size)
            .enumerate()
            .map(|(index, item)| {
                let image = item
                    .thumbnail
                    .filter(|t| !t.is_empty())
                    .or_else(|| item.enclosure.and_then(|e| e.link));
                let raw = RawItem {
                    native_id: item.guid.or_else(|| item.link.clone()),
                    title: item.title,
                    body: item.description,
                    byline: item.author.or_else(|| outlet.clone()),
                    outlet: outlet.clone(),
                    image,
                    published: item.pub_date.as_deref().and_then(parse_bridge_date),
                    url: item.link,
                    ..RawItem::default()
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}

/// A raw RSS or Atom document fetched directly.
pub struct RssFeedSource {
    client: Client,
    ctx: SourceContext,
}

impl RssFeedSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }

    fn entry_image(entry: &Entry) -> Option<String> {
        entry.media.iter().find_map(|media| {
            media
                .thumbnails
                .first()
                .map(|t| t.image.uri.clone())
                .or_else(|| {
                    media
                        .content
                        .iter()
                        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
                })
        })
    }
}

#[async_trait]
impl SourceAdapter for RssFeedSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let query = self.ctx.query(&[]);
        let response = self
            .client
            .get(&self.ctx.config.url)
            .query(&query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }
        let bytes = response.bytes().await?;
        let parsed = parser::parse(&bytes[..])?;

        let outlet = parsed.title.map(|t| t.content);
        let fetched_at = Utc::now();
        let posts = parsed
            .entries
            .into_iter()
            .take(self.ctx.config.page_size)
            .enumerate()
            .map(|(index, entry)| {
                let image = Self::entry_image(&entry);
                let link = entry.links.first().map(|l| l.href.clone());
                let published: Option<DateTime<Utc>> = entry.published.or(entry.updated);
                let raw = RawItem {
                    native_id: Some(entry.id.clone()).filter(|id| !id.is_empty()),
                    title: entry.title.map(|t| t.content),
                    body: entry
                        .summary
                        .map(|s| s.content)
                        .or_else(|| entry.content.and_then(|c| c.body)),
                    byline: entry
                        .authors
                        .first()
                        .map(|a| a.name.clone())
                        .or_else(|| outlet.clone()),
                    outlet: outlet.clone(),
                    image,
                    published,
                    url: link,
                    ..RawItem::default()
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}
