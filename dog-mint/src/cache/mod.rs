//! Durable record of upload and commit progress.
//!
//! The cache document is the resume point of the pipeline: every batch and
//! every registry group updates it and it is saved before the next step.
//! Entries are added or updated, never removed.

mod file;
mod memory;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::registry::{RegistryHandle, RegistryInitialized};
use crate::{ItemIndex, MintError, MintResult};

/// Progress of one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "onChain", default)]
    pub on_chain: bool,
}

impl CacheEntry {
    /// Link, if present and non-empty
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.is_empty())
    }
}

/// Registry bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RegistryHandle>,
}

/// The cache document.
///
/// `items` is ordered by numeric index, which is the order every stage
/// iterates in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    #[serde(default)]
    pub program: ProgramState,
    #[serde(default)]
    pub items: BTreeMap<ItemIndex, CacheEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, index: &ItemIndex) -> Option<&CacheEntry> {
        self.items.get(index)
    }

    /// Cached indices in ascending order
    pub fn ordered_indices(&self) -> Vec<ItemIndex> {
        self.items.keys().cloned().collect()
    }

    pub fn has_link(&self, index: &ItemIndex) -> bool {
        self.entry(index).and_then(CacheEntry::link).is_some()
    }

    pub fn is_on_chain(&self, index: &ItemIndex) -> bool {
        self.entry(index).is_some_and(|entry| entry.on_chain)
    }

    /// Record a successful upload. A new link invalidates any registry line.
    pub fn record_upload(&mut self, index: ItemIndex, link: String, name: String) {
        let entry = self.items.entry(index).or_default();
        entry.link = Some(link);
        entry.name = name;
        entry.on_chain = false;
    }

    /// Mark an entry as committed to the registry.
    ///
    /// Fails without touching the entry if it has no link.
    pub fn mark_on_chain(&mut self, index: &ItemIndex) -> MintResult<()> {
        match self.items.get_mut(index) {
            Some(entry) if entry.link().is_some() => {
                entry.on_chain = true;
                Ok(())
            }
            _ => Err(MintError::cache(format!(
                "Item {} has no link and cannot be marked on chain",
                index
            ))),
        }
    }

    pub fn registry_handle(&self) -> Option<&RegistryHandle> {
        self.program.config.as_ref()
    }

    pub fn set_registry(&mut self, initialized: RegistryInitialized) {
        self.program.uuid = Some(initialized.uuid);
        self.program.config = Some(initialized.handle);
    }
}

/// Persistence for cache documents, keyed by cache name and environment.
///
/// `save` replaces the whole document.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, cache_name: &str, env: &str) -> MintResult<Option<Cache>>;

    async fn save(&self, cache_name: &str, env: &str, cache: &Cache) -> MintResult<()>;
}

/// One named cache document in a store
#[derive(Clone)]
pub struct CacheSlot {
    store: Arc<dyn CacheStore>,
    name: String,
    env: String,
}

impl CacheSlot {
    pub fn new<N: Into<String>, E: Into<String>>(store: Arc<dyn CacheStore>, name: N, env: E) -> Self {
        Self {
            store,
            name: name.into(),
            env: env.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// Load the document, starting empty when there is none
    pub async fn load(&self) -> MintResult<Cache> {
        Ok(self.store.load(&self.name, &self.env).await?.unwrap_or_default())
    }

    pub async fn save(&self, cache: &Cache) -> MintResult<()> {
        self.store.save(&self.name, &self.env, cache).await
    }
}

impl std::fmt::Debug for CacheSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSlot")
            .field("name", &self.name)
            .field("env", &self.env)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn idx(s: &str) -> ItemIndex {
        ItemIndex::parse(s).unwrap()
    }

    #[test]
    fn document_uses_wire_field_names() {
        let mut cache = Cache::new();
        cache.record_upload(idx("0"), "https://arweave.net/a".into(), "Dog #0".into());
        cache.mark_on_chain(&idx("0")).unwrap();
        cache.authority = Some("Auth111".into());

        let value = serde_json::to_value(&cache).unwrap();
        assert_eq!(
            value,
            json!({
                "program": {},
                "items": {"0": {"link": "https://arweave.net/a", "name": "Dog #0", "onChain": true}},
                "authority": "Auth111"
            })
        );
    }

    #[test]
    fn items_iterate_in_numeric_order() {
        let cache: Cache = serde_json::from_value(json!({
            "items": {"10": {"name": "ten"}, "9": {"name": "nine"}, "0": {"name": "zero"}}
        }))
        .unwrap();

        let order: Vec<String> = cache.ordered_indices().into_iter().map(String::from).collect();
        assert_eq!(order, vec!["0", "9", "10"]);
        assert!(!cache.has_link(&idx("0")));
    }

    #[test]
    fn cannot_mark_unlinked_entry_on_chain() {
        let mut cache = Cache::new();
        assert!(cache.mark_on_chain(&idx("3")).is_err());

        cache.items.insert(idx("3"), CacheEntry { link: Some(String::new()), ..Default::default() });
        assert!(cache.mark_on_chain(&idx("3")).is_err());
        assert!(!cache.is_on_chain(&idx("3")));
    }

    #[test]
    fn new_upload_clears_on_chain() {
        let mut cache = Cache::new();
        cache.record_upload(idx("1"), "old".into(), "one".into());
        cache.mark_on_chain(&idx("1")).unwrap();

        cache.record_upload(idx("1"), "new".into(), "one".into());
        assert!(!cache.is_on_chain(&idx("1")));
        assert_eq!(cache.entry(&idx("1")).unwrap().link(), Some("new"));
    }

    #[tokio::test]
    async fn slot_starts_empty_and_saves_by_name() {
        let store = MemoryCacheStore::new();
        let slot = CacheSlot::new(Arc::new(store.clone()), "drop", "devnet");

        let mut cache = slot.load().await.unwrap();
        assert_eq!(cache, Cache::default());

        cache.record_upload(idx("0"), "link".into(), "zero".into());
        slot.save(&cache).await.unwrap();

        assert_eq!(store.document("drop", "devnet"), Some(cache));
        assert_eq!(store.save_count(), 1);
    }
}
