use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::aggregator::FeedAggregator;
use crate::comments::CommentFetcher;
use crate::engagement::ANONYMOUS_VIEWER;
use crate::db::{is_user_post, Database, NewPost, NewProfile, ProfileUpdate, StoreError};
use crate::model::{Author, Category, Comment, Post, UserProfile};

pub struct AppState {
    pub db: Arc<Database>,
    pub feed: Arc<FeedAggregator>,
    pub comments: Arc<CommentFetcher>,
}

// Custom error type
pub struct AppError(anyhow::Error);

impl AppError {
    fn not_found(what: impl Into<String>) -> Self {
        AppError(StoreError::NotFound(what.into()).into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        AppError(StoreError::Invalid(message.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Some(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            None => {
                error!("Request failed: {:#}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/feed", get(feed))
        .route("/api/posts/:id/like", post(like_post))
        .route(
            "/api/posts/:id/comments",
            get(post_comments).post(add_comment),
        )
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user).patch(update_user))
        .route(
            "/api/users/:id/follow/:target",
            post(follow).delete(unfollow),
        )
        .route("/api/users/:id/posts", get(user_posts).post(create_post))
        .route("/api/search", get(search))
        .with_state(state)
}

// Route handlers
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// Page size used when only `page` is given.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub refresh: bool,
    pub category: Option<String>,
    /// Viewer whose likes are reflected in `likedByViewer`
    pub user_id: Option<String>,
    /// 1-based; without `page` or `per_page` the whole feed is returned
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub status: &'static str,
    pub notice: Option<&'static str>,
    pub total: usize,
    pub has_more: bool,
    pub posts: Vec<Post>,
}

/// Offset and length of the requested page, if paging was asked for.
fn page_window(
    page: Option<usize>,
    per_page: Option<usize>,
) -> Result<Option<(usize, usize)>, AppError> {
    if page.is_none() && per_page.is_none() {
        return Ok(None);
    }
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 || per_page == 0 {
        return Err(AppError::invalid("page and per_page must be at least 1"));
    }
    Ok(Some(((page - 1).saturating_mul(per_page), per_page)))
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let category = match query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(raw) => Some(
            raw.parse::<Category>()
                .map_err(|e| AppError::invalid(e.to_string()))?,
        ),
        None => None,
    };
    let window = page_window(query.page, query.per_page)?;

    let outcome = state.feed.load(query.refresh).await;
    let status = outcome.status();
    let notice = outcome.notice();
    let mut posts = outcome.into_posts();
    if let Some(category) = category {
        posts.retain(|p| p.category == category);
    }

    let total = posts.len();
    let (mut posts, has_more) = match window {
        Some((offset, len)) => {
            let page: Vec<Post> = posts.into_iter().skip(offset).take(len).collect();
            (page, total > offset.saturating_add(len))
        }
        None => (posts, false),
    };
    let viewer = query.user_id.as_deref().unwrap_or(ANONYMOUS_VIEWER);
    state.feed.mark_liked(viewer, &mut posts).await;

    Ok(Json(FeedResponse {
        status,
        notice,
        total,
        has_more,
        posts,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    pub user_id: Option<String>,
}

pub async fn like_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    body: Option<Json<LikeRequest>>,
) -> Result<Json<Post>, AppError> {
    let Json(request) = body.unwrap_or_default();

    if is_user_post(&post_id) {
        let user_id = request
            .user_id
            .as_deref()
            .ok_or_else(|| AppError::invalid("user_id is required to like a user post"))?;
        let post = state.db.toggle_post_like(&post_id, user_id).await?;
        return Ok(Json(post));
    }

    let viewer = request.user_id.as_deref().unwrap_or(ANONYMOUS_VIEWER);
    let post = state
        .feed
        .toggle_like(viewer, &post_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;
    Ok(Json(post))
}

pub async fn post_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    if is_user_post(&post_id) {
        if state.db.get_post(&post_id, None).await?.is_none() {
            return Err(AppError::not_found(format!("post {}", post_id)));
        }
        return Ok(Json(state.db.get_post_comments(&post_id).await?));
    }

    Ok(Json(state.comments.comments_for(&post_id).await))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub user_id: Option<String>,
    pub text: String,
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    if is_user_post(&post_id) {
        let user_id = request
            .user_id
            .ok_or_else(|| AppError::invalid("user_id is required to comment on a user post"))?;
        let comment = state
            .db
            .add_post_comment(&post_id, &user_id, &request.text)
            .await?;
        return Ok((StatusCode::CREATED, Json(comment)));
    }

    // Third-party threads are read-only upstream; the comment lives with the
    // cached post's counter only.
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::invalid("comment text must not be empty"));
    }
    let author = match request.user_id.as_deref() {
        Some(user_id) => state
            .db
            .get_user_profile(user_id)
            .await?
            .map(|profile| Author {
                display_name: profile.name,
                handle: profile.username,
                avatar_url: profile.avatar,
            }),
        None => None,
    };

    state
        .feed
        .record_comment(&post_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

    let now = Utc::now();
    let comment = Comment {
        id: format!("local_{}_{}", post_id, now.timestamp_millis()),
        author: author.unwrap_or_else(|| Author {
            display_name: "You".to_string(),
            handle: "you".to_string(),
            avatar_url: "https://i.pravatar.cc/150?u=you".to_string(),
        }),
        text,
        like_count: 0,
        published_at: now,
    };
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewProfile>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = state.db.create_user_profile(new).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .db
        .get_profile_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {}", username)))?;
    Ok(Json(profile))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.db.update_user_profile(&user_id, update).await?))
}

#[derive(Serialize)]
pub struct FollowStatus {
    pub following: bool,
}

pub async fn follow(
    State(state): State<Arc<AppState>>,
    Path((user_id, target)): Path<(String, String)>,
) -> Result<Json<FollowStatus>, AppError> {
    state.db.follow_user(&user_id, &target).await?;
    Ok(Json(FollowStatus { following: true }))
}

pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    Path((user_id, target)): Path<(String, String)>,
) -> Result<Json<FollowStatus>, AppError> {
    state.db.unfollow_user(&user_id, &target).await?;
    let following = state.db.is_following(&user_id, &target).await?;
    Ok(Json(FollowStatus { following }))
}

pub async fn user_posts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Post>>, AppError> {
    if state.db.get_user_profile(&user_id).await?.is_none() {
        return Err(AppError::not_found(format!("user {}", user_id)));
    }
    Ok(Json(state.db.get_user_posts(&user_id).await?))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(new): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.db.create_user_post(&user_id, new).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(state.db.search_users(&query.q).await?))
}
