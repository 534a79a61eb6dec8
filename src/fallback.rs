//! Hard-coded posts served when no live source and no cache is available.

use chrono::{DateTime, Duration, Utc};

use crate::assets::AssetCatalog;
use crate::model::{Author, Category, Engagement, Post, PostId};

struct FallbackItem {
    category: Category,
    author: &'static str,
    handle: &'static str,
    source: &'static str,
    text: &'static str,
    long_text: &'static str,
    likes: u64,
    comments: u64,
    hours_ago: i64,
}

const ITEMS: &[FallbackItem] = &[
    FallbackItem {
        category: Category::Tech,
        author: "Tech News",
        handle: "tech_updates",
        source: "Tech Journal",
        text: "AI Revolution Transforms Software Development",
        long_text: "Artificial intelligence is changing how developers write and deploy code across industries.",
        likes: 245,
        comments: 32,
        hours_ago: 2,
    },
    FallbackItem {
        category: Category::Sports,
        author: "Sports Center",
        handle: "sports_updates",
        source: "Sports Network",
        text: "Championship Finals Set After Dramatic Semi-Finals",
        long_text: "The stage is set for an exciting championship match after yesterday's semi-final victories.",
        likes: 389,
        comments: 47,
        hours_ago: 3,
    },
    FallbackItem {
        category: Category::Crypto,
        author: "Crypto Updates",
        handle: "crypto_news",
        source: "Crypto Markets",
        text: "🟢 Bitcoin Shows Strong Recovery in Early Trading",
        long_text: "Bitcoin has shown strong bullish signals in early trading sessions today.",
        likes: 156,
        comments: 28,
        hours_ago: 4,
    },
    FallbackItem {
        category: Category::Business,
        author: "Market Watch",
        handle: "business_updates",
        source: "Business Daily",
        text: "Small Businesses Embrace Remote-First Hiring",
        long_text: "A growing share of small firms now recruit nationwide instead of locally.",
        likes: 98,
        comments: 12,
        hours_ago: 5,
    },
    FallbackItem {
        category: Category::Science,
        author: "Science Desk",
        handle: "science_updates",
        source: "Science Weekly",
        text: "Telescope Captures Sharpest Image Yet of Distant Galaxy",
        long_text: "Astronomers say the new observation could refine estimates of early star formation.",
        likes: 312,
        comments: 41,
        hours_ago: 6,
    },
    FallbackItem {
        category: Category::Health,
        author: "Health Today",
        handle: "health_updates",
        source: "Health Today",
        text: "Study Links Short Daily Walks to Better Sleep",
        long_text: "Researchers found that twenty minutes of walking improved sleep quality for most participants.",
        likes: 127,
        comments: 19,
        hours_ago: 7,
    },
    FallbackItem {
        category: Category::World,
        author: "World Desk",
        handle: "world_updates",
        source: "Global Wire",
        text: "Coastal Cities Unveil Joint Climate Adaptation Plan",
        long_text: "Officials from several port cities agreed to share flood-defence research and funding.",
        likes: 204,
        comments: 36,
        hours_ago: 8,
    },
    FallbackItem {
        category: Category::Entertainment,
        author: "Culture Beat",
        handle: "entertainment_updates",
        source: "Culture Beat",
        text: "Indie Film Festival Announces Record Lineup",
        long_text: "Organisers expect the largest audience in the festival's history this year.",
        likes: 276,
        comments: 53,
        hours_ago: 9,
    },
];

/// Fallback posts stamped relative to `now`, newest first.
pub fn fallback_posts(assets: &AssetCatalog, now: DateTime<Utc>) -> Vec<Post> {
    ITEMS
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let id = PostId::new("fallback", item.category, "demo", index, now.timestamp_millis());
            Post {
                id: id.to_string(),
                author: Author {
                    display_name: item.author.to_string(),
                    handle: item.handle.to_string(),
                    avatar_url: assets.avatar_for(item.source, item.category).to_string(),
                },
                text: item.text.to_string(),
                long_text: item.long_text.to_string(),
                media: Some(assets.placeholder_image(&format!("{}{}", item.category, index + 1))),
                engagement: Engagement {
                    like_count: item.likes,
                    comment_count: item.comments,
                },
                published_at: now - Duration::hours(item.hours_ago),
                category: item.category,
                source_label: item.source.to_string(),
                source_url: None,
                liked_by_viewer: false,
            }
        })
        .collect()
}
