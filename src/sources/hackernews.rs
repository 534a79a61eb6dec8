use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::normalize::from_unix;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

/// One record from the Hacker News item API, story or comment.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HnItem {
    pub id: u64,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: Option<u64>,
    #[serde(default)]
    pub descendants: Option<u64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub kids: Vec<u64>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

pub(crate) fn discussion_url(id: u64) -> String {
    format!("https://news.ycombinator.com/item?id={}", id)
}

pub(crate) async fn fetch_item(
    client: &Client,
    base: &str,
    id: u64,
) -> Result<HnItem, SourceError> {
    let url = format!("{}/item/{}.json", base.trim_end_matches('/'), id);
    get_json(client, &url, &[]).await
}

/// Fetch many items concurrently, skipping the ones that fail.
pub(crate) async fn fetch_items(client: &Client, base: &str, ids: &[u64]) -> Vec<HnItem> {
    let results = join_all(ids.iter().map(|id| fetch_item(client, base, *id))).await;
    results
        .into_iter()
        .zip(ids)
        .filter_map(|(result, id)| match result {
            Ok(item) if !item.deleted && !item.dead => Some(item),
            Ok(_) => None,
            Err(e) => {
                debug!("Hacker News item {} unavailable: {}", id, e);
                None
            }
        })
        .collect()
}

/// Link-aggregation source: `topstories.json` followed by one request per item.
pub struct HackerNewsSource {
    client: Client,
    ctx: SourceContext,
}

impl HackerNewsSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let base = self.ctx.config.url.trim_end_matches('/');
        let ids: Vec<u64> =
            get_json(&self.client, &format!("{}/topstories.json", base), &[]).await?;
        let ids: Vec<u64> = ids.into_iter().take(self.ctx.config.page_size).collect();

        let items = fetch_items(&self.client, base, &ids).await;
        if items.is_empty() && !ids.is_empty() {
            return Err(SourceError::Payload("no story could be fetched".to_string()));
        }

        let fetched_at = Utc::now();
        let posts = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let url = item.url.clone().unwrap_or_else(|| discussion_url(item.id));
                let raw = RawItem {
                    native_id: Some(item.id.to_string()),
                    title: item.title,
                    body: item.text.or_else(|| Some("Discussion on Hacker News".to_string())),
                    byline: item.by.clone(),
                    handle: item.by,
                    outlet: Some("Hacker News".to_string()),
                    likes: item.score,
                    comments: item.descendants,
                    published: item.time.and_then(from_unix),
                    url: Some(url),
                    ..RawItem::default()
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::model::PostId;
    use crate::sources::test_support::context;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_item(server: &MockServer, id: u64, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/item/{}.json", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn adapter(server: &MockServer, page_size: usize) -> HackerNewsSource {
        let mut ctx = context(SourceKind::HackerNews, Category::Tech, &server.uri());
        ctx.config.page_size = page_size;
        HackerNewsSource::new(Client::new(), ctx)
    }

    #[tokio::test]
    async fn test_fetches_top_stories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([101, 102, 103])))
            .mount(&server)
            .await;
        mount_item(
            &server,
            101,
            json!({
                "id": 101, "type": "story", "by": "pg", "title": "Show HN: A thing",
                "url": "https://thing.example.com", "score": 321, "descendants": 45,
                "time": 1733745600, "kids": [201, 202]
            }),
        )
        .await;
        mount_item(
            &server,
            102,
            json!({
                "id": 102, "type": "story", "by": "dang", "title": "Ask HN: Anything?",
                "text": "What are you <i>working</i> on?", "score": 12, "descendants": 3,
                "time": 1733742000
            }),
        )
        .await;

        let posts = adapter(&server, 2).fetch().await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text, "Show HN: A thing");
        assert_eq!(posts[0].author.display_name, "pg");
        assert_eq!(posts[0].author.handle, "pg");
        assert_eq!(posts[0].engagement.like_count, 321);
        assert_eq!(posts[0].engagement.comment_count, 45);
        assert_eq!(posts[0].source_label, "Hacker News");
        assert_eq!(posts[0].source_url.as_deref(), Some("https://thing.example.com"));
        assert_eq!(posts[0].long_text, "Discussion on Hacker News");

        assert_eq!(posts[1].long_text, "What are you working on?");
        assert_eq!(
            posts[1].source_url.as_deref(),
            Some("https://news.ycombinator.com/item?id=102")
        );

        let id = PostId::parse(&posts[0].id).unwrap();
        assert_eq!(id.source, "hn");
        assert_eq!(id.native, "101");
    }

    #[tokio::test]
    async fn test_failed_items_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;
        mount_item(&server, 1, json!({ "id": 1, "title": "Survivor", "time": 1733745600 })).await;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let posts = adapter(&server, 10).fetch().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "Survivor");
    }

    #[tokio::test]
    async fn test_all_items_failing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/1.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = adapter(&server, 10);
        assert!(source.fetch().await.is_err());
        assert!(source.collect().await.is_empty());
    }
}
