//! Vote ledger and feed against a real PostgreSQL
//!
//! Run with: cargo test -p vote-service --test postgres_ledger -- --ignored

mod common;

use common::{seed_users, setup_test_db};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vote_service::repository::{FeedStore, PgFeedStore};
use vote_service::services::{FeedService, VoteService};
use vote_service::ServiceError;

async fn setup() -> (Arc<PgFeedStore>, VoteService, Uuid) {
    let pool = setup_test_db().await.expect("Failed to start PostgreSQL");
    let store = Arc::new(PgFeedStore::new(pool));
    let author = seed_users(store.as_ref(), 1).await[0];
    let post = store.create_post(author, "pg", "body").await.unwrap();
    let votes = VoteService::new(store.clone(), Duration::from_secs(10));
    (store, votes, post.id)
}

async fn assert_consistent(store: &PgFeedStore, post_id: Uuid) -> i32 {
    let (points, sum) = store.audit_points(post_id).await.unwrap();
    assert_eq!(i64::from(points), sum, "points drifted from the ledger");
    points
}

/// Retry only what the ledger reports as retryable
async fn cast_with_retry(votes: &VoteService, user: Uuid, post_id: Uuid, value: i32) {
    for _ in 0..10 {
        match votes.cast_vote(Some(user), post_id, value).await {
            Ok(_) => return,
            Err(e) if e.is_retryable() => continue,
            Err(e) => panic!("vote failed: {}", e),
        }
    }
    panic!("vote kept conflicting");
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_upvote_downvote_repeat_scenario() {
    let (store, votes, post_id) = setup().await;
    let user_a = seed_users(store.as_ref(), 1).await[0];

    votes.cast_vote(Some(user_a), post_id, 1).await.unwrap();
    assert_eq!(assert_consistent(&store, post_id).await, 1);

    votes.cast_vote(Some(user_a), post_id, -1).await.unwrap();
    assert_eq!(assert_consistent(&store, post_id).await, -1);

    votes.cast_vote(Some(user_a), post_id, -1).await.unwrap();
    assert_eq!(assert_consistent(&store, post_id).await, -1);

    let key = vote_service::domain::models::VoteKey {
        user_id: user_a,
        post_id,
    };
    let rows = store.find_votes(&[key]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, -1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires Docker"]
async fn test_concurrent_votes_keep_aggregate_exact() {
    let (store, votes, post_id) = setup().await;
    let users = seed_users(store.as_ref(), 30).await;

    let handles = users.iter().enumerate().map(|(i, user)| {
        let votes = votes.clone();
        let user = *user;
        tokio::spawn(async move {
            let value = if i % 3 == 0 { -1 } else { 1 };
            cast_with_retry(&votes, user, post_id, value).await;
        })
    });
    for result in join_all(handles).await {
        result.unwrap();
    }

    // 10 down, 20 up
    assert_eq!(assert_consistent(&store, post_id).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires Docker"]
async fn test_racing_first_votes_on_one_pair() {
    let (store, votes, post_id) = setup().await;
    let user = seed_users(store.as_ref(), 1).await[0];

    let handles = (0..16).map(|i| {
        let votes = votes.clone();
        tokio::spawn(async move {
            let value = if i % 2 == 0 { 1 } else { -1 };
            cast_with_retry(&votes, user, post_id, value).await;
        })
    });
    for result in join_all(handles).await {
        result.unwrap();
    }

    let points = assert_consistent(&store, post_id).await;
    assert!(points == 1 || points == -1);
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_vote_on_missing_post_is_not_found() {
    let (store, votes, _) = setup().await;
    let user = seed_users(store.as_ref(), 1).await[0];

    let err = votes.cast_vote(Some(user), Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_expired_vote_unit_rolls_back() {
    let (store, _, post_id) = setup().await;
    let user = seed_users(store.as_ref(), 1).await[0];

    let impatient = VoteService::new(store.clone(), Duration::from_nanos(1));
    let result = impatient.cast_vote(Some(user), post_id, 1).await;

    // Either the unit finished first or it was dropped whole
    let points = assert_consistent(&store, post_id).await;
    match result {
        Ok(_) => assert_eq!(points, 1),
        Err(e) => {
            assert!(matches!(e, ServiceError::StoreUnavailable(_)));
            assert_eq!(points, 0);
        }
    }
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_feed_pages_cover_every_post_once() {
    let (store, _, first_post) = setup().await;
    let author = seed_users(store.as_ref(), 1).await[0];
    for n in 0..11 {
        store.create_post(author, &format!("p{}", n), "").await.unwrap();
    }

    let feed = FeedService::new(store.clone(), 50);
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = feed.list_feed(3, cursor.as_deref()).await.unwrap();
        seen.extend(page.posts.iter().map(|p| (p.created_at, p.id)));
        if !page.has_more {
            break;
        }
        cursor = page.next_cursor;
    }

    assert_eq!(seen.len(), 12);
    let unique: HashSet<Uuid> = seen.iter().map(|(_, id)| *id).collect();
    assert!(unique.contains(&first_post));
    assert_eq!(unique.len(), 12);
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_delete_cascades_votes() {
    let (store, votes, post_id) = setup().await;
    let voter = seed_users(store.as_ref(), 1).await[0];
    votes.cast_vote(Some(voter), post_id, 1).await.unwrap();

    let post = store.find_post(post_id).await.unwrap().unwrap();
    assert!(store.delete_post(post_id, post.creator_id).await.unwrap());

    let key = vote_service::domain::models::VoteKey {
        user_id: voter,
        post_id,
    };
    assert!(store.find_votes(&[key]).await.unwrap().is_empty());
}
