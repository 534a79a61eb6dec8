//! Generated discussion for posts whose source has no comment thread.

use chrono::{DateTime, Duration, Utc};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::assets::AssetCatalog;
use crate::model::{Author, Category, Comment};

const COMMENTERS: &[(&str, &str)] = &[
    ("Alex Johnson", "alexj"),
    ("Sarah Miller", "sarahm"),
    ("Priya Patel", "priyap"),
    ("Marcus Chen", "marcusc"),
    ("Elena Rossi", "elenar"),
    ("Jamal Wright", "jamalw"),
    ("Hannah Becker", "hannahb"),
    ("Diego Alvarez", "diegoa"),
    ("Yuki Tanaka", "yukit"),
    ("Olivia Brown", "oliviab"),
];

const GENERAL: &[&str] = &[
    "This is really interesting! Thanks for sharing.",
    "Great perspective on this topic!",
    "Didn't expect this, curious to see what happens next.",
    "Saving this one for later.",
    "Anyone have more background on this?",
    "Good summary, clear and to the point.",
    "I'd love a follow-up on this story.",
    "Sharing this with my team.",
];

const TECH: &[&str] = &[
    "The tooling story here is what really matters.",
    "Curious how this performs at scale.",
    "Open source alternatives will follow within a month.",
    "We tried something similar last year, the migration was the hard part.",
    "Finally, this has been on my wishlist forever.",
    "Security implications deserve more attention than they're getting.",
    "Benchmarks or it didn't happen.",
    "This will change how a lot of teams ship.",
];

const SPORTS: &[&str] = &[
    "What a game, the second half was unreal!",
    "The coach deserves a lot of credit for that lineup.",
    "Defense wins championships, proven again.",
    "Can't wait for the rematch.",
    "That transfer is going to pay off big.",
    "Refereeing was questionable all night.",
    "Best season in years for this squad.",
    "Injuries are going to decide this one.",
];

const CRYPTO: &[&str] = &[
    "Volatility is wild this week.",
    "Zoom out, the long-term trend is what counts.",
    "Not financial advice, but I'm watching this closely.",
    "Regulation news will move this more than anything.",
    "Volume looks thin, careful with this move.",
    "HODL as always.",
    "Interesting timing with the macro data out.",
    "On-chain metrics tell a different story.",
];

const BUSINESS: &[&str] = &[
    "Earnings season is going to be interesting.",
    "Curious how the market prices this in.",
    "Smart move by leadership, long overdue.",
    "Small businesses will feel this first.",
    "The supply chain angle is underrated here.",
    "Wonder what this means for hiring.",
];

const SCIENCE: &[&str] = &[
    "Fascinating research, can't wait for peer review.",
    "The methodology section is worth reading in full.",
    "This could open up a whole new field.",
    "Replication will be the real test.",
    "Amazing what the instruments can detect now.",
    "Science communication done right.",
];

const HEALTH: &[&str] = &[
    "Good reminder to take care of ourselves.",
    "Would like to see a larger sample size.",
    "Going to try this, thanks for sharing.",
    "My doctor mentioned something similar.",
    "Prevention is always cheaper than treatment.",
    "Helpful breakdown of the findings.",
];

const ENTERTAINMENT: &[&str] = &[
    "Already added to my watchlist!",
    "The soundtrack alone makes it worth it.",
    "Casting is perfect on this one.",
    "Hope the sequel lives up to the hype.",
    "Saw it last weekend, highly recommend.",
    "The critics and audiences disagree again.",
];

fn templates(category: Category) -> &'static [&'static str] {
    match category {
        Category::Tech => TECH,
        Category::Sports => SPORTS,
        Category::Crypto => CRYPTO,
        Category::Business => BUSINESS,
        Category::Science => SCIENCE,
        Category::Health => HEALTH,
        Category::Entertainment => ENTERTAINMENT,
        Category::World | Category::General | Category::User => GENERAL,
    }
}

/// Three to six distinct comments for `post_id`, newest first, stamped
/// within the 24 hours before `now`.
pub fn synthetic_comments(
    post_id: &str,
    category: Category,
    assets: &AssetCatalog,
    now: DateTime<Utc>,
) -> Vec<Comment> {
    let mut rng = rand::rng();
    let pool = templates(category);
    let count = rng.random_range(3..=6usize).min(pool.len());

    let mut commenters: Vec<&(&str, &str)> = COMMENTERS.iter().collect();
    commenters.shuffle(&mut rng);

    let texts: Vec<&&str> = pool.choose_multiple(&mut rng, count).collect();
    let mut comments: Vec<Comment> = texts
        .into_iter()
        .zip(commenters.into_iter().cycle())
        .enumerate()
        .map(|(i, (text, (name, username)))| Comment {
            id: format!("synthetic_{}_{}", post_id, i + 1),
            author: Author {
                display_name: name.to_string(),
                handle: username.to_string(),
                avatar_url: assets.person_avatar(username),
            },
            text: text.to_string(),
            like_count: rng.random_range(0..50),
            published_at: now - Duration::minutes(rng.random_range(1..24 * 60)),
        })
        .collect();

    comments.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    comments
}
