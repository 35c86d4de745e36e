//! Cursor-paginated feed
//!
//! Posts are ordered newest first, with the post id breaking ties between
//! equal timestamps, so the order is total and a cursor names exactly one
//! position in it.

use crate::domain::models::{FeedPage, FeedPosition, PostSummary};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{FEED_PAGES_SERVED_TOTAL, FEED_PAGE_SIZE};
use crate::repository::FeedStore;
use base64::{engine::general_purpose, Engine as _};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Hard upper bound on posts per page
pub const MAX_PAGE_SIZE: i64 = 50;

/// Opaque keyset cursor: base64url("ts:<unix micros>,id:<uuid>")
pub struct FeedCursor;

impl FeedCursor {
    pub fn encode(position: &FeedPosition) -> String {
        let cursor_str = format!(
            "ts:{},id:{}",
            position.created_at.timestamp_micros(),
            position.id
        );
        general_purpose::URL_SAFE_NO_PAD.encode(cursor_str)
    }

    pub fn decode(cursor: &str) -> ServiceResult<FeedPosition> {
        let invalid = |reason: String| ServiceError::InvalidInput(format!("Invalid cursor: {}", reason));

        let decoded = general_purpose::URL_SAFE_NO_PAD
            .decode(cursor.trim())
            .map_err(|e| invalid(e.to_string()))?;
        let cursor_str =
            String::from_utf8(decoded).map_err(|e| invalid(format!("not UTF-8: {}", e)))?;

        let (ts_part, id_part) = cursor_str
            .split_once(',')
            .ok_or_else(|| invalid("missing separator".to_string()))?;

        let micros = ts_part
            .strip_prefix("ts:")
            .ok_or_else(|| invalid("missing timestamp".to_string()))?
            .parse::<i64>()
            .map_err(|e| invalid(format!("timestamp: {}", e)))?;
        let id = id_part
            .strip_prefix("id:")
            .ok_or_else(|| invalid("missing id".to_string()))?
            .parse::<Uuid>()
            .map_err(|e| invalid(format!("id: {}", e)))?;

        let created_at = Utc
            .timestamp_micros(micros)
            .single()
            .ok_or_else(|| invalid("timestamp out of range".to_string()))?;

        Ok(FeedPosition { created_at, id })
    }
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn FeedStore>,
    max_page_size: i64,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>, max_page_size: i64) -> Self {
        Self {
            store,
            max_page_size: max_page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// One page of at most `limit` posts strictly after `cursor`.
    ///
    /// `limit` is clamped to `[1, max_page_size]`. One extra row is fetched to
    /// decide `has_more` without a count query.
    #[instrument(skip(self))]
    pub async fn list_feed(&self, limit: i32, cursor: Option<&str>) -> ServiceResult<FeedPage> {
        let limit = i64::from(limit).clamp(1, self.max_page_size);
        let after = cursor.map(FeedCursor::decode).transpose()?;

        let mut posts = self.store.list_posts(after, limit + 1).await?;

        let has_more = posts.len() as i64 > limit;
        posts.truncate(limit as usize);

        let next_cursor = posts
            .last()
            .map(|post| FeedCursor::encode(&post.feed_position()));

        FEED_PAGES_SERVED_TOTAL.inc();
        FEED_PAGE_SIZE.observe(posts.len() as f64);
        debug!(returned = posts.len(), has_more, "Feed page served");

        Ok(FeedPage {
            posts: posts.into_iter().map(PostSummary::from).collect(),
            has_more,
            next_cursor,
        })
    }
}
