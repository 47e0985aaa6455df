use std::fmt;
use std::sync::Arc;

use dog_blob::{BundleStore, SingleItemStore, DEFAULT_MAX_BUNDLE_BYTES};

use crate::planner::BatchStrategy;

/// Upload capability the pipeline runs against
#[derive(Clone)]
pub enum UploadBackend {
    /// Two-phase bundle uploads, batches bounded by cumulative size
    Bundle(Arc<dyn BundleStore>),
    /// One call per item, `window` items in flight
    Single {
        store: Arc<dyn SingleItemStore>,
        window: usize,
    },
}

impl UploadBackend {
    pub fn bundle<S: BundleStore + 'static>(store: S) -> Self {
        Self::Bundle(Arc::new(store))
    }

    /// Single-item backend using the store's advertised window
    pub fn single<S: SingleItemStore + 'static>(store: S) -> Self {
        let window = SingleItemStore::capabilities(&store).batch_window.max(1);
        Self::Single {
            store: Arc::new(store),
            window,
        }
    }

    pub fn with_window(self, window: usize) -> Self {
        match self {
            Self::Single { store, .. } => Self::Single {
                store,
                window: window.max(1),
            },
            bundle => bundle,
        }
    }

    /// How pending items are split into batches for this backend
    pub fn strategy(&self) -> BatchStrategy {
        match self {
            Self::Bundle(store) => BatchStrategy::SizeBounded {
                limit: store
                    .capabilities()
                    .max_bundle_bytes
                    .unwrap_or(DEFAULT_MAX_BUNDLE_BYTES),
            },
            Self::Single { window, .. } => BatchStrategy::CountBounded { window: *window },
        }
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, Self::Bundle(_))
    }
}

impl fmt::Debug for UploadBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle(_) => f.write_str("UploadBackend::Bundle"),
            Self::Single { window, .. } => f
                .debug_struct("UploadBackend::Single")
                .field("window", window)
                .finish(),
        }
    }
}
