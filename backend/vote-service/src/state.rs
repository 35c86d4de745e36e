use crate::config::Config;
use crate::repository::FeedStore;
use crate::services::{FeedService, PostService, RequestLoaders, VoteService};
use batch_loader::LoaderConfig;
use std::sync::Arc;

/// Services for an embedding transport layer, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeedStore>,
    pub votes: VoteService,
    pub feed: FeedService,
    pub posts: PostService,
    loader_config: LoaderConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn FeedStore>, config: &Config) -> Self {
        Self {
            votes: VoteService::new(store.clone(), config.vote.unit_timeout()),
            feed: FeedService::new(store.clone(), config.feed.max_page_size),
            posts: PostService::new(store.clone()),
            loader_config: config.loader.to_loader_config(),
            store,
        }
    }

    /// Fresh loaders for one request; drop them with the request
    pub fn request_loaders(&self) -> RequestLoaders {
        RequestLoaders::new(self.store.clone(), &self.loader_config)
    }
}
