use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use uuid::Uuid;

use crate::model::{Author, Category, Comment, Engagement, Post, UserProfile};

pub const USER_POST_PREFIX: &str = "user_";

/// Store failures the HTTP layer maps to client errors. Carried inside
/// `anyhow::Error` and recovered with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProfile {
    /// Externally assigned id, generated when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: String,
    name: String,
    username: String,
    email: Option<String>,
    avatar: String,
    bio: String,
    location: String,
    website: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, FromRow)]
struct PostRow {
    id: String,
    text: String,
    image: Option<String>,
    like_count: i64,
    comment_count: i64,
    created_at: String,
    name: String,
    username: String,
    avatar: String,
}

#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    id: i64,
    text: String,
    created_at: String,
    name: String,
    username: String,
    avatar: String,
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.text, p.image, p.like_count, p.comment_count, p.created_at,
           u.name, u.username, u.avatar
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_username(id: &str, email: Option<&str>) -> String {
    email
        .and_then(|e| e.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("user{}", id.chars().take(8).collect::<String>()))
}

pub fn is_user_post(post_id: &str) -> bool {
    post_id.starts_with(USER_POST_PREFIX)
}

/// Profiles, first-party posts and their engagement.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                avatar TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                website TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                follower_id TEXT NOT NULL REFERENCES users(id),
                followee_id TEXT NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                PRIMARY KEY (follower_id, followee_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                image TEXT,
                like_count INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_user_created
            ON posts(user_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_likes (
                post_id TEXT NOT NULL REFERENCES posts(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (post_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_comments (
                id INTEGER PRIMARY KEY,
                post_id TEXT NOT NULL REFERENCES posts(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Profiles

    pub async fn create_user_profile(&self, new: NewProfile) -> anyhow::Result<UserProfile> {
        let id = non_empty(new.id).unwrap_or_else(new_id);
        let email = non_empty(new.email);
        let username = non_empty(new.username)
            .unwrap_or_else(|| default_username(&id, email.as_deref()));
        if username.chars().any(char::is_whitespace) {
            return Err(StoreError::Invalid("username must not contain whitespace".into()).into());
        }
        if self.get_user_profile(&id).await?.is_some() {
            return Err(StoreError::Conflict(format!("profile {} already exists", id)).into());
        }
        if self.get_profile_by_username(&username).await?.is_some() {
            return Err(StoreError::Conflict(format!("username '{}' is taken", username)).into());
        }

        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO users (id, name, username, email, avatar, bio, location, website, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(non_empty(new.name).unwrap_or_else(|| "User".to_string()))
        .bind(&username)
        .bind(&email)
        .bind(non_empty(new.avatar).unwrap_or_else(|| format!("https://i.pravatar.cc/150?u={}", id)))
        .bind(new.bio.unwrap_or_default().trim().to_string())
        .bind(new.location.unwrap_or_default().trim().to_string())
        .bind(new.website.unwrap_or_default().trim().to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require_profile(&id).await
    }

    pub async fn get_user_profile(&self, id: &str) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.profile_from_row(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_profile_by_username(
        &self,
        username: &str,
    ) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.profile_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn require_profile(&self, id: &str) -> anyhow::Result<UserProfile> {
        self.get_user_profile(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)).into())
    }

    async fn profile_from_row(&self, row: UserRow) -> anyhow::Result<UserProfile> {
        let followers: Vec<(String,)> = sqlx::query_as(
            "SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY created_at",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;
        let following: Vec<(String,)> = sqlx::query_as(
            "SELECT followee_id FROM follows WHERE follower_id = ? ORDER BY created_at",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserProfile {
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            avatar: row.avatar,
            bio: row.bio,
            location: row.location,
            website: row.website,
            followers: followers.into_iter().map(|(id,)| id).collect(),
            following: following.into_iter().map(|(id,)| id).collect(),
        })
    }

    pub async fn update_user_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> anyhow::Result<UserProfile> {
        self.require_profile(id).await?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(StoreError::Invalid("name must not be empty".into()).into());
            }
        }

        sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                bio = COALESCE(?, bio),
                location = COALESCE(?, location),
                website = COALESCE(?, website),
                avatar = COALESCE(?, avatar),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.bio.as_deref().map(str::trim))
        .bind(update.location.as_deref().map(str::trim))
        .bind(update.website.as_deref().map(str::trim))
        .bind(non_empty(update.avatar))
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.require_profile(id).await
    }

    // Follows

    pub async fn follow_user(&self, me: &str, target: &str) -> anyhow::Result<()> {
        if me == target {
            return Err(StoreError::Invalid("cannot follow yourself".into()).into());
        }
        self.require_profile(me).await?;
        self.require_profile(target).await?;

        sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(me)
        .bind(target)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn unfollow_user(&self, me: &str, target: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(me)
            .bind(target)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn is_following(&self, me: &str, target: &str) -> anyhow::Result<bool> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(me)
        .bind(target)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    /// Case-insensitive substring match on name or username.
    pub async fn search_users(&self, query: &str) -> anyhow::Result<Vec<UserProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT * FROM users
            WHERE instr(lower(name), lower(?1)) > 0 OR instr(lower(username), lower(?1)) > 0
            ORDER BY username
            LIMIT 20
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            profiles.push(self.profile_from_row(row).await?);
        }
        Ok(profiles)
    }

    // Posts

    pub async fn create_user_post(&self, user_id: &str, new: NewPost) -> anyhow::Result<Post> {
        let text = new.text.trim();
        if text.is_empty() {
            return Err(StoreError::Invalid("post text must not be empty".into()).into());
        }
        self.require_profile(user_id).await?;

        let id = format!("{}{}", USER_POST_PREFIX, new_id());
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, text, image, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(text)
        .bind(non_empty(new.image))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.require_post(&id, None).await
    }

    pub async fn get_user_posts(&self, user_id: &str) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.user_id = ? ORDER BY p.created_at DESC, p.rowid DESC",
            POST_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| post_from_row(row, false)).collect()
    }

    /// A stored post, with `liked_by_viewer` resolved for `viewer` when given.
    pub async fn get_post(
        &self,
        post_id: &str,
        viewer: Option<&str>,
    ) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = ?", POST_SELECT))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let liked = match viewer {
            Some(user_id) => {
                let count: (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM post_likes WHERE post_id = ? AND user_id = ?",
                )
                .bind(post_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
                count.0 > 0
            }
            None => false,
        };
        Ok(Some(post_from_row(row, liked)?))
    }

    async fn require_post(&self, post_id: &str, viewer: Option<&str>) -> anyhow::Result<Post> {
        self.get_post(post_id, viewer)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("post {}", post_id)).into())
    }

    // Engagement

    /// Like or unlike `post_id` on behalf of `user_id`; returns the updated post.
    pub async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> anyhow::Result<Post> {
        self.require_post(post_id, None).await?;
        self.require_profile(user_id).await?;

        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed > 0 {
            sqlx::query("UPDATE posts SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.require_post(post_id, Some(user_id)).await
    }

    pub async fn add_post_comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: &str,
    ) -> anyhow::Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Invalid("comment text must not be empty".into()).into());
        }
        self.require_post(post_id, None).await?;
        self.require_profile(user_id).await?;

        let mut tx = self.pool.begin().await?;
        let comment_id = sqlx::query(
            "INSERT INTO post_comments (post_id, user_id, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(text)
        .bind(timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let comments = self.get_post_comments(post_id).await?;
        comments
            .into_iter()
            .find(|c| c.id == comment_key(comment_id))
            .ok_or_else(|| StoreError::NotFound(format!("comment {}", comment_id)).into())
    }

    /// Stored comments for a first-party post, newest first.
    pub async fn get_post_comments(&self, post_id: &str) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.text, c.created_at, u.name, u.username, u.avatar
            FROM post_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ?
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Comment {
                    id: comment_key(row.id),
                    author: Author {
                        display_name: row.name,
                        handle: row.username,
                        avatar_url: row.avatar,
                    },
                    text: row.text,
                    like_count: 0,
                    published_at: parse_timestamp(&row.created_at)?,
                })
            })
            .collect()
    }
}

fn comment_key(rowid: i64) -> String {
    format!("comment_{}", rowid)
}

fn post_from_row(row: PostRow, liked_by_viewer: bool) -> anyhow::Result<Post> {
    Ok(Post {
        published_at: parse_timestamp(&row.created_at)?,
        id: row.id,
        author: Author {
            display_name: row.name,
            handle: row.username,
            avatar_url: row.avatar,
        },
        long_text: row.text.clone(),
        text: row.text,
        media: row.image,
        engagement: Engagement {
            like_count: row.like_count.max(0) as u64,
            comment_count: row.comment_count.max(0) as u64,
        },
        category: Category::User,
        source_label: "User Post".to_string(),
        source_url: None,
        liked_by_viewer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn profile(id: &str, name: &str, email: &str) -> NewProfile {
        NewProfile {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            ..NewProfile::default()
        }
    }

    async fn seed_users(db: &Database) {
        db.create_user_profile(profile("alice-id", "Alice Smith", "alice@example.com"))
            .await
            .unwrap();
        db.create_user_profile(profile("bob-id", "Bob Jones", "bob@example.com"))
            .await
            .unwrap();
    }

    fn store_error(err: &anyhow::Error) -> &StoreError {
        err.downcast_ref::<StoreError>().unwrap()
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_database_creation() {
            let db = Database::new("sqlite::memory:").await;
            assert!(db.is_ok());
        }

        #[tokio::test]
        async fn test_double_initialization_is_safe() {
            let db = create_test_db().await;
            let result = db.initialize().await;
            assert!(result.is_ok());
        }

        #[tokio::test]
        async fn test_file_database_persists() {
            let dir = tempfile::tempdir().unwrap();
            let url = format!("sqlite:{}?mode=rwc", dir.path().join("store.db").display());

            let db = Database::new(&url).await.unwrap();
            db.initialize().await.unwrap();
            db.create_user_profile(profile("alice-id", "Alice", "alice@example.com"))
                .await
                .unwrap();
            drop(db);

            let reopened = Database::new(&url).await.unwrap();
            reopened.initialize().await.unwrap();
            assert!(reopened.get_user_profile("alice-id").await.unwrap().is_some());
        }
    }

    mod profile_tests {
        use super::*;

        #[tokio::test]
        async fn test_create_with_defaults() {
            let db = create_test_db().await;
            let created = db
                .create_user_profile(NewProfile {
                    id: Some("abcdef123456".to_string()),
                    email: Some("jane.doe@example.com".to_string()),
                    ..NewProfile::default()
                })
                .await
                .unwrap();

            assert_eq!(created.name, "User");
            assert_eq!(created.username, "jane.doe");
            assert_eq!(created.avatar, "https://i.pravatar.cc/150?u=abcdef123456");
            assert!(created.followers.is_empty());
            assert!(created.following.is_empty());
            assert_eq!(created.bio, "");
        }

        #[tokio::test]
        async fn test_username_from_id_without_email() {
            let db = create_test_db().await;
            let created = db
                .create_user_profile(NewProfile {
                    id: Some("0123456789abcdef".to_string()),
                    ..NewProfile::default()
                })
                .await
                .unwrap();
            assert_eq!(created.username, "user01234567");
        }

        #[tokio::test]
        async fn test_generated_id() {
            let db = create_test_db().await;
            let created = db.create_user_profile(NewProfile::default()).await.unwrap();
            assert_eq!(created.id.len(), 32);
            assert!(created.id.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(created.username, format!("user{}", &created.id[..8]));

            let other = db.create_user_profile(NewProfile::default()).await.unwrap();
            assert_ne!(other.id, created.id);
        }

        #[tokio::test]
        async fn test_duplicate_username_conflicts() {
            let db = create_test_db().await;
            seed_users(&db).await;
            let err = db
                .create_user_profile(profile("other-id", "Other", "alice@elsewhere.com"))
                .await
                .unwrap_err();
            assert!(matches!(store_error(&err), StoreError::Conflict(_)));
        }

        #[tokio::test]
        async fn test_lookup_by_username() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let found = db.get_profile_by_username("bob").await.unwrap().unwrap();
            assert_eq!(found.id, "bob-id");
            assert!(db.get_profile_by_username("carol").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_partial_update() {
            let db = create_test_db().await;
            seed_users(&db).await;
            let before = db.get_user_profile("alice-id").await.unwrap().unwrap();

            let updated = db
                .update_user_profile(
                    "alice-id",
                    ProfileUpdate {
                        bio: Some("Rustacean".to_string()),
                        location: Some("Berlin".to_string()),
                        ..ProfileUpdate::default()
                    },
                )
                .await
                .unwrap();

            assert_eq!(updated.name, "Alice Smith");
            assert_eq!(updated.bio, "Rustacean");
            assert_eq!(updated.location, "Berlin");
            assert!(updated.updated_at >= before.updated_at);
            assert_eq!(updated.created_at, before.created_at);
        }

        #[tokio::test]
        async fn test_update_missing_profile() {
            let db = create_test_db().await;
            let err = db
                .update_user_profile("ghost", ProfileUpdate::default())
                .await
                .unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound(_)));
        }

        #[tokio::test]
        async fn test_search_is_case_insensitive() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let by_name = db.search_users("SMITH").await.unwrap();
            assert_eq!(by_name.len(), 1);
            assert_eq!(by_name[0].id, "alice-id");

            let by_username = db.search_users("bo").await.unwrap();
            assert_eq!(by_username.len(), 1);

            assert!(db.search_users("   ").await.unwrap().is_empty());
        }
    }

    mod follow_tests {
        use super::*;

        #[tokio::test]
        async fn test_follow_updates_both_sides() {
            let db = create_test_db().await;
            seed_users(&db).await;

            db.follow_user("alice-id", "bob-id").await.unwrap();

            let alice = db.get_user_profile("alice-id").await.unwrap().unwrap();
            let bob = db.get_user_profile("bob-id").await.unwrap().unwrap();
            assert_eq!(alice.following, vec!["bob-id".to_string()]);
            assert_eq!(bob.followers, vec!["alice-id".to_string()]);
            assert!(db.is_following("alice-id", "bob-id").await.unwrap());
            assert!(!db.is_following("bob-id", "alice-id").await.unwrap());
        }

        #[tokio::test]
        async fn test_follow_is_idempotent() {
            let db = create_test_db().await;
            seed_users(&db).await;

            db.follow_user("alice-id", "bob-id").await.unwrap();
            db.follow_user("alice-id", "bob-id").await.unwrap();

            let bob = db.get_user_profile("bob-id").await.unwrap().unwrap();
            assert_eq!(bob.followers.len(), 1);
        }

        #[tokio::test]
        async fn test_unfollow() {
            let db = create_test_db().await;
            seed_users(&db).await;

            db.follow_user("alice-id", "bob-id").await.unwrap();
            db.unfollow_user("alice-id", "bob-id").await.unwrap();
            db.unfollow_user("alice-id", "bob-id").await.unwrap();

            assert!(!db.is_following("alice-id", "bob-id").await.unwrap());
        }

        #[tokio::test]
        async fn test_self_follow_rejected() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let err = db.follow_user("alice-id", "alice-id").await.unwrap_err();
            assert!(matches!(store_error(&err), StoreError::Invalid(_)));
        }

        #[tokio::test]
        async fn test_follow_unknown_user() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let err = db.follow_user("alice-id", "ghost").await.unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound(_)));
        }
    }

    mod post_tests {
        use super::*;

        #[tokio::test]
        async fn test_create_post() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let post = db
                .create_user_post(
                    "alice-id",
                    NewPost {
                        text: "  Hello world  ".to_string(),
                        image: None,
                    },
                )
                .await
                .unwrap();

            assert!(is_user_post(&post.id));
            assert_eq!(post.id.len(), USER_POST_PREFIX.len() + 32);
            assert_eq!(post.text, "Hello world");
            assert_eq!(post.category, Category::User);
            assert_eq!(post.source_label, "User Post");
            assert_eq!(post.author.handle, "alice");
            assert_eq!(post.engagement, Engagement::default());
        }

        #[tokio::test]
        async fn test_empty_post_rejected() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let err = db
                .create_user_post("alice-id", NewPost { text: " ".to_string(), image: None })
                .await
                .unwrap_err();
            assert!(matches!(store_error(&err), StoreError::Invalid(_)));
        }

        #[tokio::test]
        async fn test_user_posts_newest_first() {
            let db = create_test_db().await;
            seed_users(&db).await;

            for i in 1..=3 {
                db.create_user_post(
                    "alice-id",
                    NewPost { text: format!("Post {}", i), image: None },
                )
                .await
                .unwrap();
            }
            db.create_user_post("bob-id", NewPost { text: "Bob's".to_string(), image: None })
                .await
                .unwrap();

            let posts = db.get_user_posts("alice-id").await.unwrap();
            assert_eq!(posts.len(), 3);
            assert_eq!(posts[0].text, "Post 3");
            assert_eq!(posts[2].text, "Post 1");
        }

        #[tokio::test]
        async fn test_toggle_like_roundtrip() {
            let db = create_test_db().await;
            seed_users(&db).await;
            let post = db
                .create_user_post("alice-id", NewPost { text: "Like me".to_string(), image: None })
                .await
                .unwrap();

            let liked = db.toggle_post_like(&post.id, "bob-id").await.unwrap();
            assert_eq!(liked.engagement.like_count, 1);
            assert!(liked.liked_by_viewer);

            let unliked = db.toggle_post_like(&post.id, "bob-id").await.unwrap();
            assert_eq!(unliked.engagement.like_count, 0);
            assert!(!unliked.liked_by_viewer);
        }

        #[tokio::test]
        async fn test_like_unknown_post() {
            let db = create_test_db().await;
            seed_users(&db).await;

            let err = db.toggle_post_like("user_missing", "bob-id").await.unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound(_)));
        }

        #[tokio::test]
        async fn test_comments_increment_counter() {
            let db = create_test_db().await;
            seed_users(&db).await;
            let post = db
                .create_user_post("alice-id", NewPost { text: "Discuss".to_string(), image: None })
                .await
                .unwrap();

            let comment = db.add_post_comment(&post.id, "bob-id", "Nice post").await.unwrap();
            assert_eq!(comment.text, "Nice post");
            assert_eq!(comment.author.handle, "bob");

            db.add_post_comment(&post.id, "alice-id", "Thanks!").await.unwrap();

            let comments = db.get_post_comments(&post.id).await.unwrap();
            assert_eq!(comments.len(), 2);
            assert_eq!(comments[0].text, "Thanks!");

            let stored = db.get_post(&post.id, None).await.unwrap().unwrap();
            assert_eq!(stored.engagement.comment_count, 2);
        }

        #[tokio::test]
        async fn test_blank_comment_rejected() {
            let db = create_test_db().await;
            seed_users(&db).await;
            let post = db
                .create_user_post("alice-id", NewPost { text: "Discuss".to_string(), image: None })
                .await
                .unwrap();

            let err = db.add_post_comment(&post.id, "bob-id", "   ").await.unwrap_err();
            assert!(matches!(store_error(&err), StoreError::Invalid(_)));
        }
    }
}
