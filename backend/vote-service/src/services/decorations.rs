//! Request-scoped decorations of feed entries
//!
//! Rendering a page needs the creator of every post and, for a signed-in
//! viewer, the viewer's own vote on each one. Both are resolved through
//! batch loaders so a page costs one user query and one vote query.
//!
//! Build a fresh [`RequestLoaders`] per request: its caches must never
//! outlive it.

use crate::domain::models::{DecoratedPost, PostSummary, User, VoteKey};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::FeedStore;
use async_trait::async_trait;
use batch_loader::{request_loader, Loader, LoaderConfig, RequestLoader};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Users by id
pub struct CreatorLoader {
    store: Arc<dyn FeedStore>,
}

impl CreatorLoader {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Loader<Uuid> for CreatorLoader {
    type Value = User;
    type Error = ServiceError;

    async fn load(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, User>, ServiceError> {
        let users = self.store.find_users_by_ids(keys).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

/// Stored vote value by (user, post)
pub struct VoteStatusLoader {
    store: Arc<dyn FeedStore>,
}

impl VoteStatusLoader {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Loader<VoteKey> for VoteStatusLoader {
    type Value = i16;
    type Error = ServiceError;

    async fn load(&self, keys: &[VoteKey]) -> Result<HashMap<VoteKey, i16>, ServiceError> {
        let votes = self.store.find_votes(keys).await?;
        Ok(votes
            .into_iter()
            .map(|v| {
                (
                    VoteKey {
                        user_id: v.user_id,
                        post_id: v.post_id,
                    },
                    v.value,
                )
            })
            .collect())
    }
}

/// Loaders for one request
pub struct RequestLoaders {
    creators: RequestLoader<CreatorLoader>,
    vote_status: RequestLoader<VoteStatusLoader>,
}

impl RequestLoaders {
    pub fn new(store: Arc<dyn FeedStore>, config: &LoaderConfig) -> Self {
        Self {
            creators: request_loader(CreatorLoader::new(store.clone()), config),
            vote_status: request_loader(VoteStatusLoader::new(store), config),
        }
    }

    pub async fn creator_of(&self, creator_id: Uuid) -> ServiceResult<Option<User>> {
        self.creators.load_one(creator_id).await
    }

    /// Viewer's vote on a post; `None` for anonymous viewers or no vote
    pub async fn vote_status_of(
        &self,
        viewer: Option<Uuid>,
        post_id: Uuid,
    ) -> ServiceResult<Option<i16>> {
        let Some(user_id) = viewer else {
            return Ok(None);
        };

        self.vote_status.load_one(VoteKey { user_id, post_id }).await
    }

    /// Resolve creator and vote status for every post of a page
    pub async fn decorate(
        &self,
        posts: Vec<PostSummary>,
        viewer: Option<Uuid>,
    ) -> ServiceResult<Vec<DecoratedPost>> {
        try_join_all(posts.into_iter().map(|post| async move {
            let (creator, vote_status) = futures::try_join!(
                self.creator_of(post.creator_id),
                self.vote_status_of(viewer, post.id)
            )?;

            Ok::<_, ServiceError>(DecoratedPost {
                post,
                creator,
                vote_status,
            })
        }))
        .await
    }
}
