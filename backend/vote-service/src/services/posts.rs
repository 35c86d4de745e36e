use crate::domain::models::Post;
use crate::error::{ServiceError, ServiceResult};
use crate::repository::FeedStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Post CRUD scoped to the post's creator
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn FeedStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    pub async fn get_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        self.store.find_post(post_id).await
    }

    #[instrument(skip(self, text))]
    pub async fn create_post(
        &self,
        caller: Option<Uuid>,
        title: &str,
        text: &str,
    ) -> ServiceResult<Post> {
        let creator_id = caller.ok_or(ServiceError::Unauthorized)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidInput("title must not be empty".to_string()));
        }

        let post = self.store.create_post(creator_id, title, text).await?;
        info!(post_id = %post.id, creator_id = %creator_id, "Post created");

        Ok(post)
    }

    /// Update a post owned by the caller.
    ///
    /// `None` when the title is blank, the post is missing or owned by
    /// someone else, or the store failed; failures are logged, not surfaced.
    #[instrument(skip(self, text))]
    pub async fn update_post(
        &self,
        caller: Option<Uuid>,
        post_id: Uuid,
        title: &str,
        text: &str,
    ) -> ServiceResult<Option<Post>> {
        let creator_id = caller.ok_or(ServiceError::Unauthorized)?;

        let title = title.trim();
        if title.is_empty() {
            warn!(post_id = %post_id, "Post update rejected: blank title");
            return Ok(None);
        }

        match self.store.update_post(post_id, creator_id, title, text).await {
            Ok(post) => Ok(post),
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "Post update failed");
                Ok(None)
            }
        }
    }

    /// Delete a post owned by the caller, together with its votes.
    ///
    /// `true` only when a row was actually deleted.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, caller: Option<Uuid>, post_id: Uuid) -> ServiceResult<bool> {
        let creator_id = caller.ok_or(ServiceError::Unauthorized)?;

        match self.store.delete_post(post_id, creator_id).await {
            Ok(deleted) => {
                if deleted {
                    info!(post_id = %post_id, "Post deleted");
                }
                Ok(deleted)
            }
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "Post delete failed");
                Ok(false)
            }
        }
    }
}
