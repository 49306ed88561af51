use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use agrilink_backend::{BackendError, DataStore};
use agrilink_types::api::{NewComment, NewPost};
use agrilink_types::models::{Comment, Post, PostLike};

use crate::error::{AppError, AppResult};
use crate::session::UserContext;

/// A post as one viewer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub post: Post,
    pub liked_by_me: bool,
}

pub struct PostRepository {
    data: Arc<dyn DataStore>,
}

impl PostRepository {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }

    /// Newest first.
    pub async fn list(&self, viewer: Uuid) -> AppResult<Vec<FeedPost>> {
        let posts = self.data.list_posts().await?;
        Ok(posts
            .into_iter()
            .map(|p| FeedPost { liked_by_me: p.liker_ids.contains(&viewer), post: p.post })
            .collect())
    }

    /// Publish a post and return the refreshed feed.
    pub async fn create_post(&self, author: &UserContext, content: &str) -> AppResult<Vec<FeedPost>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Please write something!".into()));
        }

        let new = NewPost {
            content: content.to_string(),
            author_id: author.user_id(),
            author_name: author.profile.display_name().to_string(),
            author_role: author.role().as_str().to_string(),
        };
        let post = self.data.insert_post(&new).await?;
        info!("{} posted {}", author.user_id(), post.id);

        self.list(author.user_id()).await
    }

    /// Flip the viewer's like on `post_id` inside `feed`.
    ///
    /// The change shows immediately; the count is then replaced by the one the
    /// backend derives from the like rows. A failed like write restores the
    /// previous state.
    pub async fn toggle_like(&self, viewer: Uuid, feed: &mut [FeedPost], post_id: Uuid) -> AppResult<()> {
        let entry = feed
            .iter_mut()
            .find(|p| p.post.id == post_id)
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        let (was_liked, old_likes) = (entry.liked_by_me, entry.post.likes);
        entry.liked_by_me = !was_liked;
        entry.post.likes = if was_liked { (old_likes - 1).max(0) } else { old_likes + 1 };

        let like = PostLike { post_id, user_id: viewer };
        let written = if was_liked {
            self.data.delete_like(like).await
        } else {
            match self.data.insert_like(like).await {
                // Liked from another device already.
                Err(BackendError::UniqueViolation(_)) => Ok(()),
                other => other,
            }
        };

        if let Err(e) = written {
            warn!("Like toggle on {} failed, rolling back: {}", post_id, e);
            entry.liked_by_me = was_liked;
            entry.post.likes = old_likes;
            return Err(e.into());
        }

        match self.data.recount_likes(post_id).await {
            Ok(count) => {
                debug!("Post {} now has {} likes", post_id, count);
                entry.post.likes = count;
            }
            // The row is written; the next list shows the true count.
            Err(e) => warn!("Like recount on {} failed: {}", post_id, e),
        }
        Ok(())
    }

    /// Oldest first.
    pub async fn open_comments(&self, post_id: Uuid) -> AppResult<Vec<Comment>> {
        Ok(self.data.list_comments(post_id).await?)
    }

    /// Add a comment and return the whole thread.
    pub async fn post_comment(&self, author: &UserContext, post_id: Uuid, content: &str) -> AppResult<Vec<Comment>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Please write something!".into()));
        }

        let new = NewComment {
            post_id,
            user_id: author.user_id(),
            user_name: Some(author.profile.display_name().to_string()),
            content: content.to_string(),
        };
        self.data.insert_comment(&new).await?;
        self.open_comments(post_id).await
    }
}
