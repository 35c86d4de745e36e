use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters of post text exposed as a feed snippet
pub const TEXT_SNIPPET_CHARS: usize = 50;

/// User entity - local copy of an identity owned by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Post entity - the voted-on item
///
/// `points` is the running sum of every vote on the post and is written only
/// through the aggregate maintainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub points: i32,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Keyset position of this post in the feed order
    pub fn feed_position(&self) -> FeedPosition {
        FeedPosition {
            created_at: self.created_at,
            id: self.id,
        }
    }

    /// First 50 characters of the text
    pub fn text_snippet(&self) -> String {
        self.text.chars().take(TEXT_SNIPPET_CHARS).collect()
    }
}

/// Vote entity - one row per (user, post), value is -1 or +1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub value: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Composite key of the vote ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteKey {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

/// Normalized vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    /// Only an explicit -1 is a downvote; every other value counts as up
    pub fn from_raw(raw: i32) -> Self {
        if raw == -1 {
            VoteValue::Down
        } else {
            VoteValue::Up
        }
    }

    /// Decode a stored ledger value
    pub fn from_stored(value: i16) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Up),
            -1 => Some(VoteValue::Down),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }

    pub fn as_i32(self) -> i32 {
        i32::from(self.as_i16())
    }
}

/// What a vote did to the ledger, decided from the prior value of the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    /// No prior vote: row inserted, delta = value
    Inserted { delta: i32 },
    /// Prior vote had the other direction: row updated, delta = new - old
    Flipped { delta: i32 },
    /// Prior vote had the same direction: nothing written
    Unchanged,
}

impl VoteOutcome {
    pub fn plan(prior: Option<VoteValue>, next: VoteValue) -> Self {
        match prior {
            None => VoteOutcome::Inserted {
                delta: next.as_i32(),
            },
            Some(old) if old == next => VoteOutcome::Unchanged,
            Some(old) => VoteOutcome::Flipped {
                delta: next.as_i32() - old.as_i32(),
            },
        }
    }

    /// Change to apply to the post's points
    pub fn delta(&self) -> i32 {
        match self {
            VoteOutcome::Inserted { delta } | VoteOutcome::Flipped { delta } => *delta,
            VoteOutcome::Unchanged => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VoteOutcome::Inserted { .. } => "inserted",
            VoteOutcome::Flipped { .. } => "flipped",
            VoteOutcome::Unchanged => "unchanged",
        }
    }
}

/// Sort key of the feed: newest first, id breaks timestamp ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedPosition {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

/// Post as listed in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub text_snippet: String,
    pub points: i32,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        let text_snippet = post.text_snippet();
        Self {
            id: post.id,
            title: post.title,
            text_snippet,
            points: post.points,
            creator_id: post.creator_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// One page of the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    pub has_more: bool,
    /// Opaque cursor for the next page; `None` when the page is empty
    pub next_cursor: Option<String>,
}

/// Feed entry with its request-scoped decorations resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoratedPost {
    pub post: PostSummary,
    pub creator: Option<User>,
    /// Viewer's own vote; `None` if anonymous or never voted
    pub vote_status: Option<i16>,
}
