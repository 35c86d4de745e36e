pub mod decorations;
pub mod feed;
pub mod posts;
pub mod votes;

pub use decorations::RequestLoaders;
pub use feed::{FeedCursor, FeedService};
pub use posts::PostService;
pub use votes::VoteService;
