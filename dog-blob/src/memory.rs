use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    bundle_size, BlobConfig, BlobError, BlobResult, BundleItem, BundleStore, ContentId,
    GatewayLinks, LinkStrategy, RemoteLink, SingleItemStore, StoreCapabilities, Tag,
};

/// Payload kept by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub tags: Vec<Tag>,
}

/// In-memory content-addressed store for tests and dry runs.
///
/// Implements both upload contracts. Identical payloads share one id.
#[derive(Clone)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<ContentId, StoredObject>>>,
    links: Arc<dyn LinkStrategy>,
    config: BlobConfig,
    bundles: Arc<AtomicUsize>,
    singles: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(config: BlobConfig) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            links: Arc::new(GatewayLinks::new(config.link_base.clone())),
            config,
            bundles: Arc::new(AtomicUsize::new(0)),
            singles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create with custom link strategy
    pub fn with_link_strategy<L: LinkStrategy + 'static>(mut self, links: L) -> Self {
        self.links = Arc::new(links);
        self
    }

    fn put(&self, data: Bytes, tags: Vec<Tag>) -> RemoteLink {
        let id = ContentId::of(&data);
        let link = self.links.link(&id);
        self.objects.write().insert(id, StoredObject { data, tags });
        link
    }

    /// Look up a stored payload by id
    pub fn get(&self, id: &ContentId) -> Option<StoredObject> {
        self.objects.read().get(id).cloned()
    }

    /// Number of distinct payloads stored
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Number of successful bundle uploads
    pub fn bundle_uploads(&self) -> usize {
        self.bundles.load(Ordering::SeqCst)
    }

    /// Number of successful single-item uploads
    pub fn single_uploads(&self) -> usize {
        self.singles.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(BlobConfig::default())
    }
}

#[async_trait]
impl BundleStore for MemoryStore {
    async fn upload_bundle(&self, items: Vec<BundleItem>) -> BlobResult<Vec<RemoteLink>> {
        if items.is_empty() {
            return Err(BlobError::invalid("Bundle must contain at least one item"));
        }

        let size = bundle_size(&items);
        if size >= self.config.max_bundle_bytes {
            return Err(BlobError::BundleTooLarge {
                size,
                limit: self.config.max_bundle_bytes,
            });
        }

        let links: Vec<RemoteLink> = items
            .into_iter()
            .map(|item| self.put(item.data, item.tags))
            .collect();

        self.bundles.fetch_add(1, Ordering::SeqCst);
        debug!(items = links.len(), size, "Stored bundle in memory");
        Ok(links)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic()
            .with_bundles(self.config.max_bundle_bytes)
            .with_batch_window(self.config.batch_window)
    }
}

#[async_trait]
impl SingleItemStore for MemoryStore {
    async fn upload_single(&self, image: &Path, manifest: Bytes) -> BlobResult<RemoteLink> {
        let image_data = tokio::fs::read(image).await?;
        self.put(Bytes::from(image_data), Vec::new());
        let link = self.put(manifest, vec![Tag::new(crate::CONTENT_TYPE_TAG, "application/json")]);

        self.singles.fetch_add(1, Ordering::SeqCst);
        Ok(link)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_batch_window(self.config.batch_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundle_returns_one_link_per_item() {
        let store = MemoryStore::default();
        let items = vec![
            BundleItem::new(b"one".to_vec()).with_content_type("image/png"),
            BundleItem::new(b"two".to_vec()).with_content_type("image/png"),
        ];

        let links = store.upload_bundle(items).await.unwrap();

        assert_eq!(links.len(), 2);
        assert_ne!(links[0], links[1]);
        assert!(links[0].as_str().starts_with("https://arweave.net/"));
        assert_eq!(store.object_count(), 2);
        assert_eq!(store.bundle_uploads(), 1);
    }

    #[tokio::test]
    async fn bundle_at_limit_is_rejected() {
        let store = MemoryStore::new(BlobConfig::new().with_max_bundle_bytes(4));
        let items = vec![BundleItem::new(b"ab".to_vec()), BundleItem::new(b"cd".to_vec())];

        let result = store.upload_bundle(items).await;

        assert!(matches!(result, Err(BlobError::BundleTooLarge { size: 4, limit: 4 })));
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn single_upload_links_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("0.png");
        tokio::fs::write(&image, b"png-bytes").await.unwrap();

        let store = MemoryStore::default();
        let manifest = Bytes::from_static(br#"{"name":"zero"}"#);
        let link = store.upload_single(&image, manifest.clone()).await.unwrap();

        let id = ContentId::of(&manifest);
        assert!(link.as_str().ends_with(id.as_str()));
        assert_eq!(store.get(&id).unwrap().data, manifest);
        assert_eq!(store.single_uploads(), 1);
    }

    #[test]
    fn empty_bundle_is_invalid() {
        let store = MemoryStore::default();

        let result = tokio_test::block_on(store.upload_bundle(Vec::new()));

        assert!(matches!(result, Err(BlobError::Invalid { .. })));
        assert_eq!(store.bundle_uploads(), 0);
    }
}
