use std::sync::Arc;

use crate::{
    db::{Cache, MemoryStore, Store},
    services::auth::TokenKeys,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenKeys,
    /// Response cache; `None` when Redis is not configured
    pub cache: Option<Cache>,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenKeys, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            cache: None,
            bcrypt_cost,
        }
    }

    /// State over an empty in-memory store, without a cache
    pub fn in_memory(jwt_secret: &str, bcrypt_cost: u32) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            TokenKeys::new(jwt_secret, 24),
            bcrypt_cost,
        )
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }
}
