use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::normalize::parse_rfc3339;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI `top-headlines` endpoint.
pub struct NewsApiSource {
    client: Client,
    ctx: SourceContext,
}

impl NewsApiSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for NewsApiSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let query = self.ctx.query(&[
            ("pageSize", self.ctx.config.page_size.to_string()),
            ("apiKey", self.ctx.api_key()),
        ]);
        let response: Response = get_json(&self.client, &self.ctx.config.url, &query).await?;

        if response.status != "ok" {
            return Err(SourceError::Payload(
                response
                    .message
                    .unwrap_or_else(|| format!("status '{}'", response.status)),
            ));
        }

        let fetched_at = Utc::now();
        let posts = response
            .articles
            .into_iter()
            .take(self.ctx.config.page_size)
            .enumerate()
            .map(|(index, article)| {
                let outlet = article.source.and_then(|s| s.name);
                let raw = RawItem {
                    native_id: article.url.clone(),
                    title: article.title,
                    body: article.description,
                    byline: outlet.clone(),
                    outlet,
                    handle: None,
                    image: article.url_to_image,
                    likes: None,
                    comments: None,
                    published: article.published_at.as_deref().and_then(parse_rfc3339),
                    url: article.url,
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
    use crate::sources::test_support::context;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> NewsApiSource {
        let mut ctx = context(
            SourceKind::NewsApi,
            Category::Tech,
            &format!("{}/v2/top-headlines", server.uri()),
        );
        ctx.config.params.insert("category".to_string(), "technology".to_string());
        NewsApiSource::new(Client::new(), ctx)
    }

    #[tokio::test]
    async fn test_maps_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .and(query_param("category", "technology"))
            .and(query_param("apiKey", "test-key"))
            .and(query_param("pageSize", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 2,
                "articles": [
                    {
                        "source": { "id": "the-verge", "name": "The Verge" },
                        "author": "Jane Doe",
                        "title": "New chips announced",
                        "description": "A faster generation.",
                        "url": "https://www.theverge.com/chips",
                        "urlToImage": "https://cdn.theverge.com/chips.jpg",
                        "publishedAt": "2024-12-09T10:00:00Z"
                    },
                    {
                        "source": { "id": null, "name": null },
                        "author": null,
                        "title": null,
                        "description": null,
                        "url": null,
                        "urlToImage": null,
                        "publishedAt": null
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let posts = adapter(&server).fetch().await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text, "New chips announced");
        assert_eq!(posts[0].long_text, "A faster generation.");
        assert_eq!(posts[0].source_label, "The Verge");
        assert_eq!(posts[0].author.display_name, "The Verge");
        assert_eq!(posts[0].media.as_deref(), Some("https://cdn.theverge.com/chips.jpg"));
        assert_eq!(posts[0].source_url.as_deref(), Some("https://www.theverge.com/chips"));
        assert!(posts[0].id.starts_with("newsapi_tech_"));

        assert_eq!(posts[1].text, "Untitled");
        assert_eq!(posts[1].source_label, "Test Source");
        assert!(posts[1].media.is_some());
        assert_ne!(posts[0].id, posts[1].id);
    }

    #[tokio::test]
    async fn test_error_status_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "code": "rateLimited",
                "message": "You have made too many requests"
            })))
            .mount(&server)
            .await;

        let source = adapter(&server);
        assert!(matches!(source.fetch().await, Err(SourceError::Payload(_))));
        assert!(source.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_collects_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(426))
            .mount(&server)
            .await;

        let source = adapter(&server);
        assert!(matches!(source.fetch().await, Err(SourceError::Status(_))));
        assert!(source.collect().await.is_empty());
    }
}
