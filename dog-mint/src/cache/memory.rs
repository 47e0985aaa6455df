use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cache::{Cache, CacheStore};
use crate::MintResult;

/// In-process cache store; clones share the same documents
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    documents: Arc<RwLock<HashMap<(String, String), Cache>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if a previous run had saved it
    pub fn with_document(self, cache_name: &str, env: &str, cache: Cache) -> Self {
        self.documents
            .write()
            .insert((cache_name.to_string(), env.to_string()), cache);
        self
    }

    /// Latest saved document
    pub fn document(&self, cache_name: &str, env: &str) -> Option<Cache> {
        self.documents
            .read()
            .get(&(cache_name.to_string(), env.to_string()))
            .cloned()
    }

    /// Number of saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, cache_name: &str, env: &str) -> MintResult<Option<Cache>> {
        Ok(self.document(cache_name, env))
    }

    async fn save(&self, cache_name: &str, env: &str, cache: &Cache) -> MintResult<()> {
        self.documents
            .write()
            .insert((cache_name.to_string(), env.to_string()), cache.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
