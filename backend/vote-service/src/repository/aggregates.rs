//! Aggregate maintainer for `posts.points`
//!
//! The only writer of `points`. Deltas are relative increments evaluated by
//! PostgreSQL inside the caller's transaction, so concurrently committed
//! deltas commute and nothing is ever recomputed from application memory.

use sqlx::PgConnection;
use uuid::Uuid;

/// Add `delta` to a post's points within the open transaction on `conn`.
///
/// Returns `false` when no post row matched.
pub async fn apply_delta(
    conn: &mut PgConnection,
    post_id: Uuid,
    delta: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET points = points + $1
        WHERE id = $2
        "#,
    )
    .bind(delta)
    .bind(post_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Recompute the expected points of a post straight from the ledger.
///
/// Never used to write `points`; it lets operators and tests audit the
/// aggregate against `SUM(votes.value)`.
pub async fn ledger_sum(conn: &mut PgConnection, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(value), 0)::BIGINT
        FROM votes
        WHERE post_id = $1
        "#,
    )
    .bind(post_id)
    .fetch_one(conn)
    .await
}
