//! Request-scoped DataLoaders for N+1 query prevention
//!
//! PATTERN: every `load_one(key)` issued while handling one request is parked
//! by the `DataLoader`. After a short batch window (or once `max_batch_size`
//! keys are waiting) all parked keys are resolved with ONE call to
//! [`Loader::load`], and every caller is answered from that result.
//!
//! EXAMPLE:
//! Before (N+1):
//!   for post in page {
//!     creator = db.get_user(post.creator_id)  // N queries
//!   }
//!
//! After:
//!   let creators = request_loader(UserLoader::new(pool), &config);
//!   join_all(page.iter().map(|p| creators.load_one(p.creator_id)))  // 1 query
//!
//! Loaders built here cache successful values for their own lifetime, so
//! they must be created per request and dropped with it. Failed batches are
//! not cached; a later load retries them.

use async_graphql::dataloader::HashMapCache;
use std::time::Duration;

pub use async_graphql::dataloader::{DataLoader, Loader};

/// DataLoader with a per-instance value cache
pub type RequestLoader<L> = DataLoader<L, HashMapCache>;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// How long a load waits for siblings before dispatching the batch
    pub delay: Duration,
    /// Upper bound of keys per bulk fetch
    pub max_batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1),
            max_batch_size: 100,
        }
    }
}

/// Build a fresh loader for one request.
///
/// Fetches run on spawned tokio tasks, so a caller that is cancelled
/// mid-batch does not strand the other waiters of that batch.
pub fn request_loader<L>(loader: L, config: &LoaderConfig) -> RequestLoader<L>
where
    L: Send + Sync + 'static,
{
    DataLoader::with_cache(loader, tokio::task::spawn, HashMapCache::default())
        .delay(config.delay)
        .max_batch_size(config.max_batch_size.max(1))
}
