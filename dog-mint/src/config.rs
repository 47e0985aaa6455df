//! # Pipeline configuration
//!
//! `MintConfig` is a plain struct with builder-style setters. It can also be
//! layered from string key/value pairs, which is how environment overrides
//! are applied:
//!
//! ```rust
//! use dog_mint::MintConfig;
//!
//! let config = MintConfig::from_pairs([
//!     ("cache.name", "drop-1"),
//!     ("commit.group_size", "5"),
//! ])
//! .unwrap();
//!
//! assert_eq!(config.cache_name, "drop-1");
//! assert_eq!(config.commit_group_size, 5);
//! ```
//!
//! Environment variables use a prefix and `__` as the key separator, so
//! `DOGMINT__COMMIT__GROUP_SIZE=5` sets `commit.group_size`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{MintError, MintResult};

/// Prefix used by [`MintConfig::from_default_env`]
pub const ENV_PREFIX: &str = "DOGMINT__";

/// Settings of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    /// Name of the cache document
    pub cache_name: String,
    /// Environment the cache document belongs to (e.g. `devnet`)
    pub env: String,
    /// Directory holding cache documents
    pub cache_dir: PathBuf,
    /// Items uploaded concurrently by single-item backends; the store's own
    /// window when unset
    pub upload_window: Option<usize>,
    /// Keys per outer registry chunk
    pub commit_chunk_size: usize,
    /// Lines per registry write
    pub commit_group_size: usize,
    /// Registry writes in flight at once
    pub commit_concurrency: usize,
    pub mutable: bool,
    pub retain_authority: bool,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            cache_name: "temp".to_string(),
            env: "devnet".to_string(),
            cache_dir: PathBuf::from(".cache"),
            upload_window: None,
            commit_chunk_size: 1000,
            commit_group_size: 10,
            commit_concurrency: 10,
            mutable: true,
            retain_authority: true,
        }
    }
}

impl MintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_env<S: Into<String>>(mut self, env: S) -> Self {
        self.env = env.into();
        self
    }

    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_upload_window(mut self, window: usize) -> Self {
        self.upload_window = Some(window.max(1));
        self
    }

    pub fn with_commit_chunk_size(mut self, size: usize) -> Self {
        self.commit_chunk_size = size.max(1);
        self
    }

    pub fn with_commit_group_size(mut self, size: usize) -> Self {
        self.commit_group_size = size.max(1);
        self
    }

    pub fn with_commit_concurrency(mut self, concurrency: usize) -> Self {
        self.commit_concurrency = concurrency.max(1);
        self
    }

    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn with_retain_authority(mut self, retain: bool) -> Self {
        self.retain_authority = retain;
        self
    }

    /// Defaults overridden by `key = value` pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> MintResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = ConfigValues::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        Self::default().apply(&values)
    }

    /// Defaults overridden by environment variables starting with `prefix`
    pub fn from_env(prefix: &str) -> MintResult<Self> {
        Self::from_pairs(std::env::vars().filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .map(|stripped| (stripped.to_lowercase().replace("__", "."), value))
        }))
    }

    /// [`MintConfig::from_env`] with the `DOGMINT__` prefix
    pub fn from_default_env() -> MintResult<Self> {
        Self::from_env(ENV_PREFIX)
    }

    fn apply(mut self, values: &ConfigValues) -> MintResult<Self> {
        if let Some(name) = values.get_string("cache.name") {
            self.cache_name = name;
        }
        if let Some(env) = values.get_string("cache.env") {
            self.env = env;
        }
        if let Some(dir) = values.get_string("cache.dir") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(window) = values.get_positive("upload.window")? {
            self.upload_window = Some(window);
        }
        if let Some(size) = values.get_positive("commit.chunk_size")? {
            self.commit_chunk_size = size;
        }
        if let Some(size) = values.get_positive("commit.group_size")? {
            self.commit_group_size = size;
        }
        if let Some(concurrency) = values.get_positive("commit.concurrency")? {
            self.commit_concurrency = concurrency;
        }
        if let Some(mutable) = values.get_bool("registry.mutable")? {
            self.mutable = mutable;
        }
        if let Some(retain) = values.get_bool("registry.retain_authority")? {
            self.retain_authority = retain;
        }
        Ok(self)
    }
}

/// Flat string key/value view with typed getters
#[derive(Debug, Clone, Default)]
struct ConfigValues {
    map: HashMap<String, String>,
}

impl ConfigValues {
    fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.trim())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).map(str::to_string)
    }

    fn get_usize(&self, key: &str) -> MintResult<Option<usize>> {
        self.get(key)
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|e| MintError::config(key, format!("{v:?}: {e}")))
            })
            .transpose()
    }

    fn get_positive(&self, key: &str) -> MintResult<Option<usize>> {
        match self.get_usize(key)? {
            Some(0) => Err(MintError::config(key, "must be at least 1")),
            other => Ok(other),
        }
    }

    fn get_bool(&self, key: &str) -> MintResult<Option<bool>> {
        self.get(key)
            .map(|v| {
                v.parse::<bool>()
                    .map_err(|e| MintError::config(key, format!("{v:?}: {e}")))
            })
            .transpose()
    }
}
