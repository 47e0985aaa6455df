use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::cache::{Cache, CacheStore};
use crate::{MintError, MintResult};

/// Cache documents as JSON files: `<dir>/<env>-<cache name>.json`.
///
/// Saves go through a temporary sibling that is synced and renamed over the
/// target, so a reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a cache document
    pub fn path_for(&self, cache_name: &str, env: &str) -> PathBuf {
        self.dir.join(format!("{env}-{cache_name}.json"))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> MintError {
    MintError::cache(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self, cache_name: &str, env: &str) -> MintResult<Option<Cache>> {
        let path = self.path_for(cache_name, env);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, err)),
        };

        let cache = serde_json::from_slice(&bytes)
            .map_err(|err| MintError::cache(format!("{}: {}", path.display(), err)))?;
        debug!(path = %path.display(), "Loaded cache");
        Ok(Some(cache))
    }

    async fn save(&self, cache_name: &str, env: &str, cache: &Cache) -> MintResult<()> {
        let path = self.path_for(cache_name, env);
        let staging = self.dir.join(format!(".{env}-{cache_name}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(cache)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| io_error(&self.dir, err))?;

        let mut file = tokio::fs::File::create(&staging)
            .await
            .map_err(|err| io_error(&staging, err))?;
        file.write_all(&bytes).await.map_err(|err| io_error(&staging, err))?;
        file.sync_all().await.map_err(|err| io_error(&staging, err))?;
        drop(file);

        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|err| io_error(&path, err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemIndex;

    #[tokio::test]
    async fn missing_document_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join(".cache"));

        assert!(store.load("temp", "devnet").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_latest_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join(".cache"));

        let mut cache = Cache::new();
        cache.record_upload(ItemIndex::parse("0").unwrap(), "first".into(), "zero".into());
        store.save("temp", "devnet", &cache).await.unwrap();

        cache.record_upload(ItemIndex::parse("1").unwrap(), "second".into(), "one".into());
        store.save("temp", "devnet", &cache).await.unwrap();

        let loaded = store.load("temp", "devnet").await.unwrap().unwrap();
        assert_eq!(loaded, cache);
        assert!(store.path_for("temp", "devnet").ends_with("devnet-temp.json"));

        // Environments do not share documents.
        assert!(store.load("temp", "mainnet-beta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        tokio::fs::write(store.path_for("temp", "devnet"), b"{not json").await.unwrap();

        let err = store.load("temp", "devnet").await.unwrap_err();
        assert!(matches!(err, MintError::Cache { .. }));
    }
}
