use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::normalize::parse_rfc3339;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// GNews `top-headlines`, the alternate news-data API.
pub struct GnewsSource {
    client: Client,
    ctx: SourceContext,
}

impl GnewsSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for GnewsSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let query = self.ctx.query(&[
            ("max", self.ctx.config.page_size.to_string()),
            ("apikey", self.ctx.api_key()),
        ]);
        let response: Response = get_json(&self.client, &self.ctx.config.url, &query).await?;

        if let Some(errors) = response.errors {
            return Err(SourceError::Payload(errors.to_string()));
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
                    body: article.description.or(article.content),
                    byline: outlet.clone(),
                    outlet,
                    image: article.image,
                    published: article.published_at.as_deref().and_then(parse_rfc3339),
                    url: article.url,
                    ..RawItem::default()
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}
