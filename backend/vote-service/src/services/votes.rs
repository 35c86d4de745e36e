use crate::domain::models::{VoteOutcome, VoteValue};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{VOTES_CAST_TOTAL, VOTE_FAILURES_TOTAL, VOTE_UNIT_DURATION_SECONDS};
use crate::repository::FeedStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Casts votes against the ledger.
///
/// Each call is one atomic unit at the store: the vote row and the post's
/// points change together or not at all. A unit that outlives
/// `unit_timeout` is dropped, which rolls it back.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn FeedStore>,
    unit_timeout: Duration,
}

impl VoteService {
    pub fn new(store: Arc<dyn FeedStore>, unit_timeout: Duration) -> Self {
        Self {
            store,
            unit_timeout,
        }
    }

    /// Cast `raw_value` (only -1 is a downvote) for `caller` on `post_id`.
    ///
    /// Returns `Ok(true)` for inserted, flipped and unchanged votes alike.
    #[instrument(skip(self), fields(outcome))]
    pub async fn cast_vote(
        &self,
        caller: Option<Uuid>,
        post_id: Uuid,
        raw_value: i32,
    ) -> ServiceResult<bool> {
        let user_id = caller.ok_or(ServiceError::Unauthorized)?;
        let value = VoteValue::from_raw(raw_value);

        let outcome = self.record(user_id, post_id, value).await.map_err(|e| {
            VOTE_FAILURES_TOTAL.with_label_values(&[e.kind()]).inc();
            warn!(
                user_id = %user_id,
                post_id = %post_id,
                error = %e,
                retryable = e.is_retryable(),
                "Vote was not applied"
            );
            e
        })?;

        tracing::Span::current().record("outcome", outcome.label());
        VOTES_CAST_TOTAL.with_label_values(&[outcome.label()]).inc();
        debug!(
            user_id = %user_id,
            post_id = %post_id,
            delta = outcome.delta(),
            "Vote applied"
        );

        Ok(true)
    }

    async fn record(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        value: VoteValue,
    ) -> ServiceResult<VoteOutcome> {
        let timer = VOTE_UNIT_DURATION_SECONDS.start_timer();
        let result = tokio::time::timeout(
            self.unit_timeout,
            self.store.record_vote(user_id, post_id, value),
        )
        .await;
        timer.observe_duration();

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(ServiceError::StoreUnavailable(format!(
                "vote unit exceeded {:?} and was rolled back",
                self.unit_timeout
            ))),
        }
    }
}
