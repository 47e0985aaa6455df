use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobResult, BundleItem, ContentId, RemoteLink};

/// Stores that upload many items as one atomic transaction
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Upload all items together, returning exactly one link per item in
    /// input order. Either every item is stored or the call fails.
    async fn upload_bundle(&self, items: Vec<BundleItem>) -> BlobResult<Vec<RemoteLink>>;

    /// Get store capabilities
    fn capabilities(&self) -> StoreCapabilities;
}

/// Stores that take one image and its manifest per call
#[async_trait]
pub trait SingleItemStore: Send + Sync {
    /// Upload the image at `image` together with its manifest document.
    /// The returned link addresses the manifest.
    async fn upload_single(&self, image: &Path, manifest: Bytes) -> BlobResult<RemoteLink>;

    /// Get store capabilities
    fn capabilities(&self) -> StoreCapabilities;
}

/// Store capabilities
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    pub supports_bundles: bool,
    pub max_bundle_bytes: Option<u64>,
    pub batch_window: usize,
}

impl StoreCapabilities {
    pub fn basic() -> Self {
        Self {
            supports_bundles: false,
            max_bundle_bytes: None,
            batch_window: 1,
        }
    }

    pub fn with_bundles(mut self, max_bundle_bytes: u64) -> Self {
        self.supports_bundles = true;
        self.max_bundle_bytes = Some(max_bundle_bytes);
        self
    }

    pub fn with_batch_window(mut self, window: usize) -> Self {
        self.batch_window = window.max(1);
        self
    }
}

/// Strategy for turning content ids into links
pub trait LinkStrategy: Send + Sync {
    /// Link for a stored payload
    fn link(&self, id: &ContentId) -> RemoteLink;
}

/// Gateway links: `{base}/{id}`
#[derive(Debug, Clone)]
pub struct GatewayLinks {
    base: String,
}

impl GatewayLinks {
    pub fn new<S: Into<String>>(base: S) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl LinkStrategy for GatewayLinks {
    fn link(&self, id: &ContentId) -> RemoteLink {
        RemoteLink::new(format!("{}/{}", self.base, id))
    }
}
