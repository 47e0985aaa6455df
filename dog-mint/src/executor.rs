//! Upload of one planned batch.
//!
//! Bundle backends upload in two phases: all images of the batch as one
//! bundle, then the manifests patched with their image links as a second
//! bundle. The batch succeeds or fails as a whole. Single-item backends
//! upload every item of the batch concurrently and fail per item.

use std::collections::BTreeMap;

use dog_blob::{BundleItem, BundleStore, BlobError, RemoteLink, SingleItemStore};
use futures::future::join_all;
use tracing::{debug, error, info, instrument};

use crate::backend::UploadBackend;
use crate::manifest::Manifest;
use crate::planner::{Batch, BatchStrategy};
use crate::{AssetPair, ItemIndex, MintError, MintResult};

const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Assets of a run, by index
pub type AssetMap = BTreeMap<ItemIndex, AssetPair>;

/// An item whose manifest is stored remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedItem {
    pub index: ItemIndex,
    /// Link of the uploaded manifest
    pub link: String,
    pub name: String,
}

/// An item that could not be uploaded in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub index: ItemIndex,
    pub reason: String,
}

/// Outcome of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub uploaded: Vec<UploadedItem>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn all_failed(batch: &Batch, reason: &str) -> Self {
        Self {
            uploaded: Vec::new(),
            failed: batch
                .items
                .iter()
                .map(|index| FailedItem {
                    index: index.clone(),
                    reason: reason.to_string(),
                })
                .collect(),
        }
    }
}

/// Drives batch uploads against one backend
#[derive(Debug, Clone)]
pub struct Uploader {
    backend: UploadBackend,
}

impl Uploader {
    pub fn new(backend: UploadBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &UploadBackend {
        &self.backend
    }

    pub fn strategy(&self) -> BatchStrategy {
        self.backend.strategy()
    }

    /// Upload one batch. Never fails as a whole; failures are reported per
    /// item in the returned report.
    #[instrument(skip(self, batch, assets), fields(items = batch.len(), bytes = batch.total_bytes))]
    pub async fn upload_batch(&self, batch: &Batch, assets: &AssetMap) -> BatchReport {
        match &self.backend {
            UploadBackend::Bundle(store) => {
                match upload_bundle_batch(store.as_ref(), batch, assets).await {
                    Ok(uploaded) => {
                        info!("Uploaded bundle of {} items", uploaded.len());
                        BatchReport {
                            uploaded,
                            failed: Vec::new(),
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "Bundle upload failed, no item of the batch was recorded");
                        BatchReport::all_failed(batch, &err.to_string())
                    }
                }
            }
            UploadBackend::Single { store, .. } => {
                upload_single_batch(store.as_ref(), batch, assets).await
            }
        }
    }
}

fn asset_for<'a>(assets: &'a AssetMap, index: &ItemIndex) -> MintResult<&'a AssetPair> {
    assets.get(index).ok_or_else(|| {
        MintError::from(BlobError::invalid(format!("No image on disk for item {index}")))
    })
}

fn check_link_count(expected: usize, links: &[RemoteLink]) -> MintResult<()> {
    if links.len() != expected {
        return Err(BlobError::LinkCountMismatch {
            expected,
            actual: links.len(),
        }
        .into());
    }
    Ok(())
}

/// Image link as embedded in manifests: `<link>?ext=<extension>`
fn image_link(link: &RemoteLink, pair: &AssetPair) -> String {
    let ext = pair.extension();
    if ext.is_empty() {
        link.to_string()
    } else {
        format!("{link}?ext={ext}")
    }
}

async fn upload_bundle_batch(
    store: &dyn BundleStore,
    batch: &Batch,
    assets: &AssetMap,
) -> MintResult<Vec<UploadedItem>> {
    let pairs = batch
        .items
        .iter()
        .map(|index| asset_for(assets, index))
        .collect::<MintResult<Vec<_>>>()?;

    // Everything local is read before the first network call.
    let mut images = Vec::with_capacity(pairs.len());
    let mut manifests = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let data = tokio::fs::read(&pair.image).await?;
        images.push(BundleItem::new(data).with_content_type(pair.content_type()));
        manifests.push(Manifest::load(&pair.manifest).await?);
    }

    let image_links = store.upload_bundle(images).await?;
    check_link_count(pairs.len(), &image_links)?;
    debug!(items = image_links.len(), "Image bundle stored");

    let mut names = Vec::with_capacity(pairs.len());
    let mut patched = Vec::with_capacity(pairs.len());
    for ((pair, manifest), link) in pairs.iter().zip(manifests).zip(&image_links) {
        let manifest = manifest.with_image_link(&image_link(link, pair), pair.content_type());
        names.push(manifest.name.clone());
        patched.push(BundleItem::new(manifest.to_vec()?).with_content_type(MANIFEST_CONTENT_TYPE));
    }

    let manifest_links = store.upload_bundle(patched).await?;
    check_link_count(pairs.len(), &manifest_links)?;

    Ok(pairs
        .into_iter()
        .zip(names)
        .zip(manifest_links)
        .map(|((pair, name), link)| UploadedItem {
            index: pair.index.clone(),
            link: link.into_string(),
            name,
        })
        .collect())
}

async fn upload_single_item(
    store: &dyn SingleItemStore,
    index: &ItemIndex,
    assets: &AssetMap,
) -> MintResult<UploadedItem> {
    let pair = asset_for(assets, index)?;
    let manifest_bytes = tokio::fs::read(&pair.manifest).await?;
    let name = Manifest::from_slice(&manifest_bytes)?.name;

    let link = store.upload_single(&pair.image, manifest_bytes.into()).await?;
    Ok(UploadedItem {
        index: index.clone(),
        link: link.into_string(),
        name,
    })
}

async fn upload_single_batch(store: &dyn SingleItemStore, batch: &Batch, assets: &AssetMap) -> BatchReport {
    let results = join_all(batch.items.iter().map(|index| async move {
        (index, upload_single_item(store, index, assets).await)
    }))
    .await;

    let mut report = BatchReport::default();
    for (index, result) in results {
        match result {
            Ok(item) => report.uploaded.push(item),
            Err(err) => {
                error!(index = %index, error = %err, "Item upload failed");
                report.failed.push(FailedItem {
                    index: index.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}
