//! Vote ledger properties against the in-memory store
//!
//! - points always equals the sum of the post's votes
//! - at most one vote per (user, post)
//! - repeating a vote changes nothing
//! - flipping moves points by exactly two

mod common;

use common::seed_users;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vote_service::repository::{FeedStore, InMemoryFeedStore};
use vote_service::services::VoteService;
use vote_service::ServiceError;

struct Ledger {
    store: Arc<InMemoryFeedStore>,
    votes: VoteService,
    post_id: Uuid,
}

async fn ledger() -> Ledger {
    let store = Arc::new(InMemoryFeedStore::new());
    let author = seed_users(store.as_ref(), 1).await[0];
    let post = store
        .create_post(author, "ledger", "body")
        .await
        .expect("Failed to create post");

    Ledger {
        votes: VoteService::new(store.clone(), Duration::from_secs(5)),
        store,
        post_id: post.id,
    }
}

fn points(ledger: &Ledger) -> i32 {
    let (points, sum) = ledger.store.audit_points(ledger.post_id).unwrap();
    assert_eq!(i64::from(points), sum, "points drifted from the ledger");
    points
}

#[tokio::test]
async fn test_upvote_downvote_repeat_scenario() {
    let ledger = ledger().await;
    let user_a = seed_users(ledger.store.as_ref(), 1).await[0];
    let baseline = points(&ledger);

    assert!(ledger.votes.cast_vote(Some(user_a), ledger.post_id, 1).await.unwrap());
    assert_eq!(points(&ledger), baseline + 1);
    let rows = ledger.store.votes_for_post(ledger.post_id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, 1);

    assert!(ledger.votes.cast_vote(Some(user_a), ledger.post_id, -1).await.unwrap());
    assert_eq!(points(&ledger), baseline - 1);
    let rows = ledger.store.votes_for_post(ledger.post_id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, -1);

    assert!(ledger.votes.cast_vote(Some(user_a), ledger.post_id, -1).await.unwrap());
    assert_eq!(points(&ledger), baseline - 1);
    assert_eq!(ledger.store.votes_for_post(ledger.post_id), rows);
}

#[tokio::test]
async fn test_flip_moves_points_by_two() {
    let ledger = ledger().await;
    let users = seed_users(ledger.store.as_ref(), 3).await;

    // Other voters so the flip starts from a non-trivial total
    ledger.votes.cast_vote(Some(users[1]), ledger.post_id, 1).await.unwrap();
    ledger.votes.cast_vote(Some(users[2]), ledger.post_id, 1).await.unwrap();

    ledger.votes.cast_vote(Some(users[0]), ledger.post_id, 1).await.unwrap();
    let before_flip = points(&ledger);

    ledger.votes.cast_vote(Some(users[0]), ledger.post_id, -1).await.unwrap();
    assert_eq!(points(&ledger), before_flip - 2);

    ledger.votes.cast_vote(Some(users[0]), ledger.post_id, 1).await.unwrap();
    assert_eq!(points(&ledger), before_flip);
}

#[tokio::test]
async fn test_repeated_vote_is_idempotent() {
    let ledger = ledger().await;
    let user = seed_users(ledger.store.as_ref(), 1).await[0];

    ledger.votes.cast_vote(Some(user), ledger.post_id, 1).await.unwrap();
    let points_after_first = points(&ledger);
    let rows_after_first = ledger.store.votes_for_post(ledger.post_id);

    for _ in 0..5 {
        assert!(ledger.votes.cast_vote(Some(user), ledger.post_id, 1).await.unwrap());
    }

    assert_eq!(points(&ledger), points_after_first);
    assert_eq!(ledger.store.votes_for_post(ledger.post_id), rows_after_first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_from_many_users_all_land() {
    let ledger = ledger().await;
    let users = seed_users(ledger.store.as_ref(), 40).await;

    let results = join_all(users.iter().enumerate().map(|(i, user)| {
        let votes = ledger.votes.clone();
        let post_id = ledger.post_id;
        let user = *user;
        let value = if i % 4 == 0 { -1 } else { 1 };
        tokio::spawn(async move { votes.cast_vote(Some(user), post_id, value).await })
    }))
    .await;

    for result in results {
        assert!(result.unwrap().unwrap());
    }

    // 10 down, 30 up
    assert_eq!(points(&ledger), 20);
    assert_eq!(ledger.store.votes_for_post(ledger.post_id).len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_on_same_pair_keep_one_row() {
    let ledger = ledger().await;
    let user = seed_users(ledger.store.as_ref(), 1).await[0];

    let results = join_all((0..32).map(|i| {
        let votes = ledger.votes.clone();
        let post_id = ledger.post_id;
        let value = if i % 2 == 0 { 1 } else { -1 };
        tokio::spawn(async move { votes.cast_vote(Some(user), post_id, value).await })
    }))
    .await;

    for result in results {
        assert!(result.unwrap().unwrap());
    }

    let rows = ledger.store.votes_for_post(ledger.post_id);
    assert_eq!(rows.len(), 1);
    assert_eq!(points(&ledger), i32::from(rows[0].value));
}

#[tokio::test]
async fn test_rejected_votes_leave_ledger_untouched() {
    let ledger = ledger().await;
    let user = seed_users(ledger.store.as_ref(), 1).await[0];

    let err = ledger.votes.cast_vote(None, ledger.post_id, 1).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));

    let err = ledger
        .votes
        .cast_vote(Some(user), Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Voter identity unknown to the store
    let err = ledger
        .votes
        .cast_vote(Some(Uuid::new_v4()), ledger.post_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    assert_eq!(points(&ledger), 0);
    assert!(ledger.store.votes_for_post(ledger.post_id).is_empty());
}
