pub mod aggregates;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryFeedStore;
pub use postgres::PgFeedStore;

use crate::domain::models::{FeedPosition, Post, User, Vote, VoteKey, VoteOutcome, VoteValue};
use crate::error::ServiceResult;
use uuid::Uuid;

/// Durable store behind the vote ledger and the feed.
///
/// `PgFeedStore` is the production implementation; `InMemoryFeedStore`
/// provides the same atomicity guarantees in-process for tests and local runs.
#[async_trait::async_trait]
pub trait FeedStore: Send + Sync {
    /// Insert or refresh the local copy of an identity
    async fn upsert_user(&self, user_id: Uuid, username: &str) -> ServiceResult<User>;

    /// Batch lookup of users; missing ids are simply absent from the result
    async fn find_users_by_ids(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>>;

    /// Create a post with zero points
    async fn create_post(&self, creator_id: Uuid, title: &str, text: &str) -> ServiceResult<Post>;

    async fn find_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>>;

    /// Update title/text if `creator_id` owns the post; `None` otherwise
    async fn update_post(
        &self,
        post_id: Uuid,
        creator_id: Uuid,
        title: &str,
        text: &str,
    ) -> ServiceResult<Option<Post>>;

    /// Delete the post (and its votes) if `creator_id` owns it
    async fn delete_post(&self, post_id: Uuid, creator_id: Uuid) -> ServiceResult<bool>;

    /// Up to `limit` posts in feed order, strictly after `after` when given
    async fn list_posts(&self, after: Option<FeedPosition>, limit: i64) -> ServiceResult<Vec<Post>>;

    /// Apply one vote as a single atomic unit.
    ///
    /// Reads the prior vote for `(user_id, post_id)` under exclusive access to
    /// that pair, writes the vote row and the aggregate delta together, and
    /// reports what happened. Nothing is written for `VoteOutcome::Unchanged`.
    async fn record_vote(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> ServiceResult<VoteOutcome>;

    /// Batch lookup of ledger rows
    async fn find_votes(&self, keys: &[VoteKey]) -> ServiceResult<Vec<Vote>>;
}
