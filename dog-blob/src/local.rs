use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::{
    bundle_size, BlobConfig, BlobError, BlobResult, BundleItem, BundleStore, ContentId,
    RemoteLink, SingleItemStore, StoreCapabilities, Tag,
};

/// Content-addressed store backed by a local directory.
///
/// Each payload lands at `<root>/<content id>`, its tags (if any) at
/// `<root>/<content id>.tags.json`. Links use the `file://` scheme. Useful
/// for staging a collection before pointing the pipeline at a real store.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
    config: BlobConfig,
}

impl LocalDirStore {
    pub fn new<P: Into<PathBuf>>(root: P, config: BlobConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored payload
    pub fn object_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn link_for(&self, id: &ContentId) -> RemoteLink {
        RemoteLink::new(format!("file://{}", self.object_path(id).display()))
    }

    fn tags_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(format!("{}.tags.json", id))
    }

    async fn write_object(&self, data: &[u8], tags: &[Tag]) -> BlobResult<RemoteLink> {
        let id = ContentId::of(data);
        let path = self.object_path(&id);
        let tags_path = self.tags_path(&id);

        // A payload is only visible once its tags are on disk, so an
        // existing payload with missing tags means an interrupted write.
        if tokio::fs::try_exists(&path).await?
            && (tags.is_empty() || tokio::fs::try_exists(&tags_path).await?)
        {
            return Ok(self.link_for(&id));
        }

        if !tags.is_empty() {
            tokio::fs::write(&tags_path, serde_json::to_vec(tags)?).await?;
        }

        let staging = self.root.join(format!(".{}.partial", id));
        tokio::fs::write(&staging, data).await?;
        tokio::fs::rename(&staging, &path).await?;

        Ok(self.link_for(&id))
    }
}

#[async_trait]
impl BundleStore for LocalDirStore {
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

        tokio::fs::create_dir_all(&self.root).await?;

        let mut links = Vec::with_capacity(items.len());
        for item in &items {
            links.push(self.write_object(&item.data, &item.tags).await?);
        }

        debug!(root = %self.root.display(), items = links.len(), size, "Wrote bundle to directory");
        Ok(links)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic()
            .with_bundles(self.config.max_bundle_bytes)
            .with_batch_window(self.config.batch_window)
    }
}

#[async_trait]
impl SingleItemStore for LocalDirStore {
    async fn upload_single(&self, image: &Path, manifest: Bytes) -> BlobResult<RemoteLink> {
        tokio::fs::create_dir_all(&self.root).await?;

        let image_data = tokio::fs::read(image).await?;
        self.write_object(&image_data, &[]).await?;
        self.write_object(&manifest, &[Tag::new(crate::CONTENT_TYPE_TAG, "application/json")])
            .await
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_batch_window(self.config.batch_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundle_writes_payloads_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path().join("out"), BlobConfig::default());

        let links = store
            .upload_bundle(vec![BundleItem::new(b"image".to_vec()).with_content_type("image/png")])
            .await
            .unwrap();

        let id = ContentId::of(b"image");
        let stored = tokio::fs::read(store.object_path(&id)).await.unwrap();
        assert_eq!(stored, b"image");
        assert!(links[0].as_str().starts_with("file://"));

        let tags: Vec<Tag> = serde_json::from_slice(
            &tokio::fs::read(store.root().join(format!("{}.tags.json", id))).await.unwrap(),
        )
        .unwrap();
        assert_eq!(tags, vec![Tag::new("Content-Type", "image/png")]);
    }

    #[tokio::test]
    async fn existing_payload_without_tags_gets_its_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path(), BlobConfig::default());
        let id = ContentId::of(b"image");
        // Left behind by a write interrupted before its tags
        tokio::fs::write(store.object_path(&id), b"image").await.unwrap();

        store
            .upload_bundle(vec![BundleItem::new(b"image".to_vec()).with_content_type("image/png")])
            .await
            .unwrap();

        let tags: Vec<Tag> =
            serde_json::from_slice(&tokio::fs::read(store.tags_path(&id)).await.unwrap()).unwrap();
        assert_eq!(tags, vec![Tag::new("Content-Type", "image/png")]);
        assert_eq!(tokio::fs::read(store.object_path(&id)).await.unwrap(), b"image");
    }

    #[tokio::test]
    async fn single_upload_missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path(), BlobConfig::default());

        let result = store
            .upload_single(&dir.path().join("missing.png"), Bytes::from_static(b"{}"))
            .await;

        assert!(matches!(result, Err(BlobError::Io { .. })));
    }
}
