use super::aggregates;
use super::FeedStore;
use crate::domain::models::{FeedPosition, Post, User, Vote, VoteKey, VoteOutcome, VoteValue};
use crate::error::{ServiceError, ServiceResult};
use db_pool::begin_with_metrics;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

const SERVICE_NAME: &str = "vote-service";

/// PostgreSQL implementation of the vote ledger and feed store
#[derive(Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check
    pub async fn health_check(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Audit a post's cached points against the ledger: (points, sum of votes)
    pub async fn audit_points(&self, post_id: Uuid) -> ServiceResult<(i32, i64)> {
        let mut conn = self.pool.acquire().await?;

        let points: i32 = sqlx::query_scalar("SELECT points FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_one(&mut *conn)
            .await?;
        let sum = aggregates::ledger_sum(&mut *conn, post_id).await?;

        Ok((points, sum))
    }
}

#[async_trait::async_trait]
impl FeedStore for PgFeedStore {
    async fn upsert_user(&self, user_id: Uuid, username: &str) -> ServiceResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username
            RETURNING id, username, created_at
            "#,
        )
        .bind(user_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_users_by_ids(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn create_post(&self, creator_id: Uuid, title: &str, text: &str) -> ServiceResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, text, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, text, points, creator_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(text)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, text, points, creator_id, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        creator_id: Uuid,
        title: &str,
        text: &str,
    ) -> ServiceResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $3, text = $4, updated_at = clock_timestamp()
            WHERE id = $1 AND creator_id = $2
            RETURNING id, title, text, points, creator_id, created_at, updated_at
            "#,
        )
        .bind(post_id)
        .bind(creator_id)
        .bind(title)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: Uuid, creator_id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM posts
            WHERE id = $1 AND creator_id = $2
            "#,
        )
        .bind(post_id)
        .bind(creator_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(&self, after: Option<FeedPosition>, limit: i64) -> ServiceResult<Vec<Post>> {
        let posts = match after {
            Some(position) => {
                sqlx::query_as::<_, Post>(
                    r#"
                    SELECT id, title, text, points, creator_id, created_at, updated_at
                    FROM posts
                    WHERE (created_at, id) < ($1, $2)
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3
                    "#,
                )
                .bind(position.created_at)
                .bind(position.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>(
                    r#"
                    SELECT id, title, text, points, creator_id, created_at, updated_at
                    FROM posts
                    ORDER BY created_at DESC, id DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(posts)
    }

    async fn record_vote(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> ServiceResult<VoteOutcome> {
        // Dropping `tx` on any early return (error, timeout, cancellation)
        // rolls the whole unit back.
        let mut tx = begin_with_metrics(&self.pool, SERVICE_NAME).await?;

        // A concurrent first vote on the same pair makes this wait for the
        // other transaction and then report the conflict as "no row inserted".
        let inserted: Option<i16> = sqlx::query_scalar(
            r#"
            INSERT INTO votes (user_id, post_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING value
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(value.as_i16())
        .fetch_optional(&mut *tx)
        .await?;

        let prior = match inserted {
            Some(_) => None,
            None => {
                let stored: i16 = sqlx::query_scalar(
                    r#"
                    SELECT value
                    FROM votes
                    WHERE user_id = $1 AND post_id = $2
                    FOR UPDATE
                    "#,
                )
                .bind(user_id)
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("post {}", post_id)))?;

                Some(VoteValue::from_stored(stored).ok_or_else(|| {
                    ServiceError::StoreUnavailable(format!(
                        "vote ledger holds out-of-range value {}",
                        stored
                    ))
                })?)
            }
        };

        let outcome = VoteOutcome::plan(prior, value);
        match outcome {
            VoteOutcome::Unchanged => {
                tx.commit().await?;
                return Ok(outcome);
            }
            VoteOutcome::Flipped { .. } => {
                sqlx::query(
                    r#"
                    UPDATE votes
                    SET value = $3, updated_at = NOW()
                    WHERE user_id = $1 AND post_id = $2
                    "#,
                )
                .bind(user_id)
                .bind(post_id)
                .bind(value.as_i16())
                .execute(&mut *tx)
                .await?;
            }
            VoteOutcome::Inserted { .. } => {}
        }

        if !aggregates::apply_delta(&mut *tx, post_id, outcome.delta()).await? {
            return Err(ServiceError::NotFound(format!("post {}", post_id)));
        }

        tx.commit().await?;

        debug!(
            user_id = %user_id,
            post_id = %post_id,
            outcome = outcome.label(),
            delta = outcome.delta(),
            "Vote unit committed"
        );

        Ok(outcome)
    }

    async fn find_votes(&self, keys: &[VoteKey]) -> ServiceResult<Vec<Vote>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let (user_ids, post_ids): (Vec<Uuid>, Vec<Uuid>) =
            keys.iter().map(|k| (k.user_id, k.post_id)).unzip();

        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT v.user_id, v.post_id, v.value, v.created_at, v.updated_at
            FROM votes v
            JOIN UNNEST($1::uuid[], $2::uuid[]) AS k(user_id, post_id)
              ON v.user_id = k.user_id AND v.post_id = k.post_id
            "#,
        )
        .bind(&user_ids)
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }
}
