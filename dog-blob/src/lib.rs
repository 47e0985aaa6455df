//! # dog-blob: content-addressed upload capabilities
//!
//! `dog-blob` defines the two upload contracts that DogRS publishing
//! pipelines talk to, and ships stores that implement them:
//!
//! - **[`BundleStore`]**: many payloads in one atomic transaction, one link per payload
//! - **[`SingleItemStore`]**: one image plus its manifest per call
//!
//! Backends differ in wire protocol only; callers see links and errors.
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryStore::new(BlobConfig::default());
//!
//! let links = store
//!     .upload_bundle(vec![
//!         BundleItem::new(b"\x89PNG...".to_vec()).with_content_type("image/png"),
//!     ])
//!     .await?;
//!
//! assert_eq!(links.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   Upload pipeline    │  ← batching, caching, retries across runs
//! ├──────────────────────┤
//! │ BundleStore / Single │  ← upload contracts
//! ├──────────────────────┤
//! │  Memory, LocalDir …  │  ← concrete backends
//! └──────────────────────┘
//! ```

mod config;
mod error;
mod local;
mod memory;
pub mod store;
mod types;

pub use config::{BlobConfig, DEFAULT_MAX_BUNDLE_BYTES};
pub use error::{BlobError, BlobResult};
pub use local::LocalDirStore;
pub use memory::{MemoryStore, StoredObject};
pub use store::{BundleStore, GatewayLinks, LinkStrategy, SingleItemStore, StoreCapabilities};
pub use types::{bundle_size, BundleItem, ContentId, RemoteLink, Tag, CONTENT_TYPE_TAG};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobConfig, BlobError, BlobResult, BundleItem, BundleStore, MemoryStore, RemoteLink,
        SingleItemStore,
    };
}
