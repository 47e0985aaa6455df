/// Default ceiling for the cumulative payload of one bundle (50 MiB).
///
/// Bundles are kept well below what bundling endpoints accept so that a
/// failed bundle is cheap to redo and peak memory stays bounded.
pub const DEFAULT_MAX_BUNDLE_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration shared by the bundled stores
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// A bundle whose payload reaches this many bytes is rejected
    pub max_bundle_bytes: u64,

    /// Base used to build links from content ids
    pub link_base: String,

    /// How many single-item uploads a caller may run at once
    pub batch_window: usize,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_bundle_bytes: DEFAULT_MAX_BUNDLE_BYTES,
            link_base: "https://arweave.net".to_string(),
            batch_window: 1,
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bundle size ceiling
    pub fn with_max_bundle_bytes(mut self, bytes: u64) -> Self {
        self.max_bundle_bytes = bytes;
        self
    }

    /// Set the link base (no trailing slash needed)
    pub fn with_link_base<S: Into<String>>(mut self, base: S) -> Self {
        self.link_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the single-item upload window (clamped to at least 1)
    pub fn with_batch_window(mut self, window: usize) -> Self {
        self.batch_window = window.max(1);
        self
    }
}
