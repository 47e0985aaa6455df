//! # dog-mint: resumable collection uploads
//!
//! `dog-mint` publishes a directory of `N.png` + `N.json` pairs: every image
//! and its manifest are uploaded through a [`dog_blob`] store, the resulting
//! links are recorded in a cache document, and the links are then committed
//! to an external registry in fixed-size groups.
//!
//! Runs are resumable. The cache is saved after every upload batch and every
//! registry group, and a rerun only touches what is still missing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use dog_blob::MemoryStore;
//! use dog_mint::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> MintResult<()> {
//! let config = MintConfig::from_default_env()?;
//! let cache = FileCacheStore::new(config.cache_dir.clone());
//!
//! let pipeline = Pipeline::new(
//!     config,
//!     UploadBackend::bundle(MemoryStore::default()),
//!     Arc::new(MemoryRegistry::default()),
//!     Arc::new(cache),
//! );
//!
//! let report = pipeline.run_dir(Path::new("./assets")).await?;
//! if !report.success() {
//!     eprintln!("{} uploads failed, rerun to resume", report.failed_uploads.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │         Pipeline          │  ← sequencing, cache persistence
//! ├─────────────┬─────────────┤
//! │  Selector   │  Committer  │  ← work list, grouped registry writes
//! │  Planner    │             │
//! │  Uploader   │             │
//! ├─────────────┼─────────────┤
//! │ UploadBackend │ Registry  │  ← injected capabilities
//! ├─────────────┴─────────────┤
//! │        CacheStore         │  ← durable resume point
//! └───────────────────────────┘
//! ```

mod assets;
mod backend;
pub mod cache;
mod committer;
mod config;
mod error;
mod executor;
pub mod manifest;
mod pipeline;
pub mod planner;
pub mod registry;
pub mod selector;

pub use assets::{content_type_for, discover_assets, AssetPair, ItemIndex, IMAGE_TYPES};
pub use backend::UploadBackend;
pub use cache::{Cache, CacheEntry, CacheSlot, CacheStore, FileCacheStore, MemoryCacheStore, ProgramState};
pub use committer::{commit_lines, CommitOptions, CommitReport};
pub use config::{MintConfig, ENV_PREFIX};
pub use error::{MintError, MintResult};
pub use executor::{AssetMap, BatchReport, FailedItem, UploadedItem, Uploader};
pub use manifest::Manifest;
pub use pipeline::{Pipeline, RunReport};
pub use planner::{plan_batches, Batch, BatchStrategy, PlannedItem};
pub use registry::memory::MemoryRegistry;
pub use registry::{
    ConfigLine, Registry, RegistryCreator, RegistryHandle, RegistryInit, RegistryInitialized,
};
pub use selector::{all_items, ensure_dense, pending_items, select, select_assets, Selection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetPair, CacheStore, FileCacheStore, ItemIndex, MemoryCacheStore, MemoryRegistry,
        MintConfig, MintError, MintResult, Pipeline, Registry, RunReport, UploadBackend,
    };
}
