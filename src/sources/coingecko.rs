use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::normalize::parse_rfc3339;
use super::{get_json, RawItem, SourceAdapter, SourceContext, SourceError};
use crate::model::{Category, Post};

#[derive(Debug, Deserialize)]
struct Coin {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    last_updated: Option<String>,
}

/// Thousands separators and two decimals, e.g. `45,230.00`.
fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    // Values that round to zero print unsigned.
    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

/// 24h change rounded to two decimals; missing or rounds-to-zero is flat.
fn rounded_change(change: Option<f64>) -> Option<f64> {
    change
        .map(|c| (c * 100.0).round() / 100.0)
        .filter(|c| c.is_finite() && *c != 0.0)
}

fn headline(coin: &Coin, price: f64, change: Option<f64>) -> String {
    let price = format_price(price);
    match change {
        Some(c) if c > 0.0 => format!("🟢 {} surges to ${}", coin.name, price),
        Some(_) => format!("🔴 {} dips to ${}", coin.name, price),
        None => format!("⚪ {} holds at ${}", coin.name, price),
    }
}

fn market_update(coin: &Coin, price: f64, change: Option<f64>) -> String {
    let change = match change {
        Some(c) if c > 0.0 => format!("+{:.2}% change", c),
        Some(c) => format!("{:.2}% change", c),
        None => "no change".to_string(),
    };
    format!(
        "Market update: {} ({}) is trading at ${} with {}.",
        coin.name,
        coin.symbol.to_uppercase(),
        format_price(price),
        change
    )
}

/// Market-data source: CoinGecko `coins/markets`, one post per coin.
pub struct CoinGeckoSource {
    client: Client,
    ctx: SourceContext,
}

impl CoinGeckoSource {
    pub fn new(client: Client, ctx: SourceContext) -> Self {
        Self { client, ctx }
    }
}

#[async_trait]
impl SourceAdapter for CoinGeckoSource {
    fn name(&self) -> &str {
        &self.ctx.config.name
    }

    fn category(&self) -> Category {
        self.ctx.category()
    }

    async fn fetch(&self) -> Result<Vec<Post>, SourceError> {
        let url = format!("{}/coins/markets", self.ctx.config.url.trim_end_matches('/'));
        let mut extra = vec![
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.ctx.config.page_size.to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(key) = &self.ctx.config.api_key {
            extra.push(("x_cg_demo_api_key", key.clone()));
        }
        let coins: Vec<Coin> = get_json(&self.client, &url, &self.ctx.query(&extra)).await?;

        let fetched_at = Utc::now();
        let posts = coins
            .into_iter()
            .take(self.ctx.config.page_size)
            .enumerate()
            .map(|(index, coin)| {
                let price = coin.current_price.unwrap_or_default();
                let change = rounded_change(coin.price_change_percentage_24h);
                let raw = RawItem {
                    native_id: Some(coin.id.clone()),
                    title: Some(headline(&coin, price, change)),
                    body: Some(market_update(&coin, price, change)),
                    byline: Some("Crypto Analyst".to_string()),
                    handle: Some("crypto_expert".to_string()),
                    outlet: Some("Crypto Markets".to_string()),
                    image: coin.image.clone(),
                    published: coin.last_updated.as_deref().and_then(parse_rfc3339),
                    url: Some(format!("https://www.coingecko.com/en/coins/{}", coin.id)),
                    ..RawItem::default()
                };
                self.ctx.normalize(index, raw, fetched_at)
            })
            .collect();

        Ok(posts)
    }
}
