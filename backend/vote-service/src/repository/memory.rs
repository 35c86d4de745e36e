use super::FeedStore;
use crate::domain::models::{FeedPosition, Post, User, Vote, VoteKey, VoteOutcome, VoteValue};
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    votes: HashMap<VoteKey, Vote>,
}

impl Tables {
    /// Aggregate maintainer: relative increment inside the caller's critical
    /// section, never a recomputation.
    fn apply_delta(&mut self, post_id: Uuid, delta: i32) -> bool {
        match self.posts.get_mut(&post_id) {
            Some(post) => {
                post.points += delta;
                true
            }
            None => false,
        }
    }
}

/// In-process store with the same guarantees as the PostgreSQL one.
///
/// Every operation runs inside one critical section of a single lock that is
/// never held across an await, so a vote row and its aggregate delta become
/// visible together.
#[derive(Default)]
pub struct InMemoryFeedStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

// PostgreSQL keeps microseconds; mirror it so cursors round-trip identically
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(now)
}

impl InMemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every subsequent call fails with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed a post verbatim (fixtures with chosen timestamps)
    pub fn insert_post(&self, post: Post) {
        self.tables.write().posts.insert(post.id, post);
    }

    /// All ledger rows of one post
    pub fn votes_for_post(&self, post_id: Uuid) -> Vec<Vote> {
        self.tables
            .read()
            .votes
            .values()
            .filter(|v| v.post_id == post_id)
            .cloned()
            .collect()
    }

    /// (points, sum of votes) read under one lock
    pub fn audit_points(&self, post_id: Uuid) -> Option<(i32, i64)> {
        let tables = self.tables.read();
        let post = tables.posts.get(&post_id)?;
        let sum = tables
            .votes
            .values()
            .filter(|v| v.post_id == post_id)
            .map(|v| i64::from(v.value))
            .sum();
        Some((post.points, sum))
    }

    fn check_available(&self) -> ServiceResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedStore for InMemoryFeedStore {
    async fn upsert_user(&self, user_id: Uuid, username: &str) -> ServiceResult<User> {
        self.check_available()?;
        let mut tables = self.tables.write();

        let user = tables.users.entry(user_id).or_insert_with(|| User {
            id: user_id,
            username: username.to_string(),
            created_at: now_micros(),
        });
        user.username = username.to_string();

        Ok(user.clone())
    }

    async fn find_users_by_ids(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        self.check_available()?;
        let tables = self.tables.read();

        Ok(user_ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn create_post(&self, creator_id: Uuid, title: &str, text: &str) -> ServiceResult<Post> {
        self.check_available()?;
        let mut tables = self.tables.write();

        if !tables.users.contains_key(&creator_id) {
            return Err(ServiceError::NotFound(format!("user {}", creator_id)));
        }

        let now = now_micros();
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            text: text.to_string(),
            points: 0,
            creator_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        self.check_available()?;
        Ok(self.tables.read().posts.get(&post_id).cloned())
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        creator_id: Uuid,
        title: &str,
        text: &str,
    ) -> ServiceResult<Option<Post>> {
        self.check_available()?;
        let mut tables = self.tables.write();

        let post = match tables.posts.get_mut(&post_id) {
            Some(post) if post.creator_id == creator_id => post,
            _ => return Ok(None),
        };
        post.title = title.to_string();
        post.text = text.to_string();
        post.updated_at = now_micros();

        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid, creator_id: Uuid) -> ServiceResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write();

        let owned = tables
            .posts
            .get(&post_id)
            .map(|p| p.creator_id == creator_id)
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }

        tables.posts.remove(&post_id);
        // ON DELETE CASCADE
        tables.votes.retain(|key, _| key.post_id != post_id);

        Ok(true)
    }

    async fn list_posts(&self, after: Option<FeedPosition>, limit: i64) -> ServiceResult<Vec<Post>> {
        self.check_available()?;
        let tables = self.tables.read();

        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| match after {
                Some(boundary) => (p.created_at, p.id) < (boundary.created_at, boundary.id),
                None => true,
            })
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(posts.into_iter().take(limit).cloned().collect())
    }

    async fn record_vote(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> ServiceResult<VoteOutcome> {
        self.check_available()?;
        let mut tables = self.tables.write();

        if !tables.posts.contains_key(&post_id) {
            return Err(ServiceError::NotFound(format!("post {}", post_id)));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(ServiceError::NotFound(format!("user {}", user_id)));
        }

        let key = VoteKey { user_id, post_id };
        let prior = match tables.votes.get(&key) {
            Some(vote) => Some(VoteValue::from_stored(vote.value).ok_or_else(|| {
                ServiceError::StoreUnavailable(format!(
                    "vote ledger holds out-of-range value {}",
                    vote.value
                ))
            })?),
            None => None,
        };

        let outcome = VoteOutcome::plan(prior, value);
        let now = now_micros();
        match outcome {
            VoteOutcome::Unchanged => return Ok(outcome),
            VoteOutcome::Inserted { .. } => {
                tables.votes.insert(
                    key,
                    Vote {
                        user_id,
                        post_id,
                        value: value.as_i16(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            VoteOutcome::Flipped { .. } => {
                if let Some(vote) = tables.votes.get_mut(&key) {
                    vote.value = value.as_i16();
                    vote.updated_at = now;
                }
            }
        }

        // Post existence was checked under the same lock
        tables.apply_delta(post_id, outcome.delta());

        Ok(outcome)
    }

    async fn find_votes(&self, keys: &[VoteKey]) -> ServiceResult<Vec<Vote>> {
        self.check_available()?;
        let tables = self.tables.read();

        Ok(keys
            .iter()
            .filter_map(|key| tables.votes.get(key).cloned())
            .collect())
    }
}
