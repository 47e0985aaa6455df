//! Fixtures and fake capabilities shared by the conformance suites.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;

use dog_blob::{
    BlobConfig, BlobError, BlobResult, BundleItem, BundleStore, MemoryStore, RemoteLink,
    SingleItemStore, StoreCapabilities,
};
use dog_mint::{
    AssetPair, ConfigLine, MemoryCacheStore, MemoryRegistry, MintConfig, MintError, MintResult,
    Pipeline, Registry, RegistryHandle, RegistryInit, RegistryInitialized, UploadBackend,
};

pub const CACHE_NAME: &str = "temp";
pub const ENV: &str = "devnet";

/// Write `N.png` (filled with `N`, of the given size) and `N.json` for each size
pub async fn write_collection(dir: &Path, sizes: &[usize]) -> Vec<AssetPair> {
    let mut pairs = Vec::with_capacity(sizes.len());
    for (i, size) in sizes.iter().enumerate() {
        let image = dir.join(format!("{i}.png"));
        tokio::fs::write(&image, vec![i as u8; *size]).await.unwrap();

        let manifest = json!({
            "name": format!("Dog #{i}"),
            "symbol": "DOG",
            "seller_fee_basis_points": 500,
            "image": format!("{i}.png"),
            "properties": {
                "files": [{"uri": format!("{i}.png"), "type": "image/png"}],
                "creators": [{"address": "Creator111", "share": 100}]
            }
        });
        tokio::fs::write(dir.join(format!("{i}.json")), manifest.to_string())
            .await
            .unwrap();

        pairs.push(AssetPair::from_image(image).unwrap());
    }
    pairs
}

pub fn pipeline(
    backend: UploadBackend,
    registry: Arc<dyn Registry>,
    caches: &MemoryCacheStore,
) -> Pipeline {
    Pipeline::new(MintConfig::default(), backend, registry, Arc::new(caches.clone()))
}

pub fn linked_count(caches: &MemoryCacheStore) -> usize {
    caches
        .document(CACHE_NAME, ENV)
        .map(|cache| cache.items.values().filter(|e| e.link().is_some()).count())
        .unwrap_or(0)
}

fn is_manifest_bundle(items: &[BundleItem]) -> bool {
    items
        .iter()
        .all(|item| item.content_type() == Some("application/json"))
}

/// Bundle store advertising a small limit and recording image bundle sizes
#[derive(Clone)]
pub struct RecordingBundleStore {
    inner: MemoryStore,
    limit: u64,
    image_bundles: Arc<Mutex<Vec<Vec<u64>>>>,
}

impl RecordingBundleStore {
    pub fn new(limit: u64) -> Self {
        Self {
            inner: MemoryStore::new(BlobConfig::default()),
            limit,
            image_bundles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Item sizes of every image bundle, in upload order
    pub fn image_bundles(&self) -> Vec<Vec<u64>> {
        self.image_bundles.lock().clone()
    }

    pub fn bundle_calls(&self) -> usize {
        self.inner.bundle_uploads()
    }
}

#[async_trait]
impl BundleStore for RecordingBundleStore {
    async fn upload_bundle(&self, items: Vec<BundleItem>) -> BlobResult<Vec<RemoteLink>> {
        if !is_manifest_bundle(&items) {
            self.image_bundles
                .lock()
                .push(items.iter().map(BundleItem::size_bytes).collect());
        }
        self.inner.upload_bundle(items).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_bundles(self.limit)
    }
}

/// Bundle store whose manifest phase always fails
#[derive(Clone, Default)]
pub struct ManifestPhaseFailingStore {
    inner: MemoryStore,
    image_bundles: Arc<AtomicUsize>,
}

impl ManifestPhaseFailingStore {
    pub fn image_bundles(&self) -> usize {
        self.image_bundles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleStore for ManifestPhaseFailingStore {
    async fn upload_bundle(&self, items: Vec<BundleItem>) -> BlobResult<Vec<RemoteLink>> {
        if is_manifest_bundle(&items) {
            return Err(BlobError::upload_failed("bundler rejected manifest transaction"));
        }
        self.image_bundles.fetch_add(1, Ordering::SeqCst);
        self.inner.upload_bundle(items).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        BundleStore::capabilities(&self.inner)
    }
}

/// Single-item store failing for chosen image stems
#[derive(Clone)]
pub struct FlakySingleStore {
    inner: MemoryStore,
    failing: Arc<HashSet<String>>,
    window: usize,
}

impl FlakySingleStore {
    pub fn new(failing: &[&str], window: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            failing: Arc::new(failing.iter().map(|s| s.to_string()).collect()),
            window,
        }
    }

    pub fn healthy(window: usize) -> Self {
        Self::new(&[], window)
    }

    pub fn uploads(&self) -> usize {
        self.inner.single_uploads()
    }
}

#[async_trait]
impl SingleItemStore for FlakySingleStore {
    async fn upload_single(&self, image: &Path, manifest: Bytes) -> BlobResult<RemoteLink> {
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if self.failing.contains(stem) {
            return Err(BlobError::upload_failed(format!("gateway timeout for {stem}")));
        }
        self.inner.upload_single(image, manifest).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_batch_window(self.window)
    }
}

/// Single-item store recording how many uploads run at the same time
#[derive(Clone)]
pub struct InFlightSingleStore {
    inner: MemoryStore,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    window: usize,
}

impl InFlightSingleStore {
    pub fn new(window: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            window,
        }
    }

    /// Most uploads ever in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.inner.single_uploads()
    }
}

#[async_trait]
impl SingleItemStore for InFlightSingleStore {
    async fn upload_single(&self, image: &Path, manifest: Bytes) -> BlobResult<RemoteLink> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let result = self.inner.upload_single(image, manifest).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_batch_window(self.window)
    }
}

/// Registry failing initialization or the write starting at a chosen slot
#[derive(Clone, Default)]
pub struct FailingRegistry {
    pub inner: MemoryRegistry,
    fail_init: bool,
    fail_start: Option<u32>,
}

impl FailingRegistry {
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Default::default()
        }
    }

    pub fn failing_write_at(start: u32) -> Self {
        Self {
            fail_start: Some(start),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Registry for FailingRegistry {
    async fn init_registry(&self, init: RegistryInit) -> MintResult<RegistryInitialized> {
        if self.fail_init {
            return Err(MintError::registry("blockhash not found"));
        }
        self.inner.init_registry(init).await
    }

    async fn write_lines(
        &self,
        handle: &RegistryHandle,
        start_index: u32,
        lines: Vec<ConfigLine>,
    ) -> MintResult<()> {
        if self.fail_start == Some(start_index) {
            return Err(MintError::registry("transaction simulation failed"));
        }
        self.inner.write_lines(handle, start_index, lines).await
    }

    fn authority(&self) -> String {
        self.inner.authority()
    }
}
