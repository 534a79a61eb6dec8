//! Like and comment counters for third-party posts.
//!
//! Counters live on the cached post and are shared by every viewer. Whether a
//! given viewer liked a post is tracked separately and stamped onto the copy
//! served to that viewer.

use std::collections::{HashMap, HashSet};

use crate::model::Post;

/// Viewer key for requests that carry no `user_id`.
pub const ANONYMOUS_VIEWER: &str = "anonymous";

/// Move the shared counter by one for a viewer whose like is now `liked`.
pub fn apply_like(post: &mut Post, liked: bool) {
    if liked {
        post.engagement.like_count += 1;
    } else {
        post.engagement.like_count = post.engagement.like_count.saturating_sub(1);
    }
}

pub fn record_comment(post: &mut Post) {
    post.engagement.comment_count += 1;
}

/// Post ids each viewer currently likes.
#[derive(Debug, Default)]
pub struct ViewerLikes {
    by_viewer: HashMap<String, HashSet<String>>,
}

impl ViewerLikes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, viewer: &str, post_id: &str) -> bool {
        self.by_viewer
            .get(viewer)
            .is_some_and(|liked| liked.contains(post_id))
    }

    pub fn set(&mut self, viewer: &str, post_id: &str, liked: bool) {
        if liked {
            self.by_viewer
                .entry(viewer.to_string())
                .or_default()
                .insert(post_id.to_string());
        } else if let Some(ids) = self.by_viewer.get_mut(viewer) {
            ids.remove(post_id);
            if ids.is_empty() {
                self.by_viewer.remove(viewer);
            }
        }
    }

    /// Set `liked_by_viewer` on each post for `viewer`.
    pub fn mark(&self, viewer: &str, posts: &mut [Post]) {
        for post in posts {
            post.liked_by_viewer = self.is_liked(viewer, &post.id);
        }
    }
}
