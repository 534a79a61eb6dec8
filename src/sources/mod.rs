//! Source adapters: one per upstream content API, each producing normalized posts.

pub mod coingecko;
pub mod gnews;
pub mod hackernews;
pub mod newsapi;
pub mod normalize;
pub mod reddit;
pub mod rss;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::assets::AssetCatalog;
use crate::config::{SourceConfig, SourceKind};
use crate::model::{Category, Post};

pub use normalize::{RawItem, SourceContext};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(StatusCode),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("feed parse failed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    async fn fetch(&self) -> Result<Vec<Post>, SourceError>;

    /// Adapter boundary: failures are logged and become an empty batch.
    async fn collect(&self) -> Vec<Post> {
        match self.fetch().await {
            Ok(posts) => {
                info!(
                    "Source '{}' ({}) returned {} posts",
                    self.name(),
                    self.category(),
                    posts.len()
                );
                posts
            }
            Err(e) => {
                warn!("Source '{}' ({}) failed: {}", self.name(), self.category(), e);
                Vec::new()
            }
        }
    }
}

/// Shared HTTP client for every adapter and the comment fetcher.
pub fn http_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("ConnectSphere/1.0 (Feed Aggregator)")
        .build()?;
    Ok(client)
}

/// GET a URL and decode its JSON body, mapping non-2xx to `SourceError::Status`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(String, String)],
) -> Result<T, SourceError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Payload(e.to_string()))
}

pub fn build_adapter(
    config: &SourceConfig,
    client: Client,
    assets: Arc<AssetCatalog>,
) -> Box<dyn SourceAdapter> {
    let ctx = SourceContext::new(config.clone(), assets);
    match config.kind {
        SourceKind::NewsApi => Box::new(newsapi::NewsApiSource::new(client, ctx)),
        SourceKind::Gnews => Box::new(gnews::GnewsSource::new(client, ctx)),
        SourceKind::RssBridge => Box::new(rss::RssBridgeSource::new(client, ctx)),
        SourceKind::Rss => Box::new(rss::RssFeedSource::new(client, ctx)),
        SourceKind::HackerNews => Box::new(hackernews::HackerNewsSource::new(client, ctx)),
        SourceKind::Reddit => Box::new(reddit::RedditSource::new(client, ctx)),
        SourceKind::CoinGecko => Box::new(coingecko::CoinGeckoSource::new(client, ctx)),
    }
}
