use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::assets::discover_assets;
use crate::backend::UploadBackend;
use crate::cache::{Cache, CacheSlot, CacheStore};
use crate::committer::{commit_lines, CommitOptions, CommitReport};
use crate::config::MintConfig;
use crate::executor::{AssetMap, FailedItem, Uploader};
use crate::manifest::Manifest;
use crate::planner::{plan_batches, PlannedItem};
use crate::registry::{Registry, RegistryCreator, RegistryHandle, RegistryInit};
use crate::selector::{ensure_dense, select_assets, Selection};
use crate::{AssetPair, ItemIndex, MintError, MintResult};

/// Outcome of a pipeline run that was not aborted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items uploaded in this run
    pub uploaded: usize,
    pub failed_uploads: Vec<FailedItem>,
    pub groups_written: usize,
    pub groups_skipped: usize,
    pub groups_failed: usize,
    /// Groups held back because a member has no link
    pub groups_incomplete: usize,
}

impl RunReport {
    /// True only if every upload and every registry write succeeded
    pub fn success(&self) -> bool {
        self.failed_uploads.is_empty() && self.groups_failed == 0 && self.groups_incomplete == 0
    }

    fn record_commit(&mut self, commit: CommitReport) {
        self.groups_written = commit.written;
        self.groups_skipped = commit.skipped;
        self.groups_failed = commit.failed;
        self.groups_incomplete = commit.incomplete;
    }
}

/// Resumable upload and commit of a collection.
///
/// The pipeline owns the clients it is built with; nothing is constructed
/// lazily or shared through globals. The cache document is the only state
/// carried between runs, and it is saved after every batch and every
/// registry group.
pub struct Pipeline {
    config: MintConfig,
    uploader: Uploader,
    registry: Arc<dyn Registry>,
    cache: CacheSlot,
}

impl Pipeline {
    pub fn new(
        config: MintConfig,
        backend: UploadBackend,
        registry: Arc<dyn Registry>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        let cache = CacheSlot::new(cache_store, config.cache_name.clone(), config.env.clone());
        let backend = match config.upload_window {
            Some(window) => backend.with_window(window),
            None => backend,
        };
        Self {
            config,
            uploader: Uploader::new(backend),
            registry,
            cache,
        }
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    /// Discover the assets in `dir` and run on them
    pub async fn run_dir(&self, dir: &Path) -> MintResult<RunReport> {
        let assets = discover_assets(dir).await?;
        self.run(&assets).await
    }

    /// Upload what is missing, then commit what is not on chain.
    ///
    /// Per-item and per-group failures end up in the report; an `Err` means
    /// the run was aborted, with the cache at its last saved state.
    #[instrument(skip_all, fields(cache = %self.config.cache_name, env = %self.config.env, items = assets.len()))]
    pub async fn run(&self, assets: &[AssetPair]) -> MintResult<RunReport> {
        let mut cache = self.cache.load().await?;
        let mut report = RunReport::default();

        let authority = self.registry.authority();
        if cache.authority.as_deref() != Some(authority.as_str()) {
            cache.authority = Some(authority);
            self.cache.save(&cache).await?;
        }

        let selection = select_assets(assets, &cache);
        ensure_dense(&selection.all)?;
        if selection.all.is_empty() {
            info!("Nothing to upload or commit");
            return Ok(report);
        }

        let assets: AssetMap = assets
            .iter()
            .map(|pair| (pair.index.clone(), pair.clone()))
            .collect();

        if selection.is_complete() {
            info!("All items already uploaded");
        } else {
            self.upload_pending(&mut cache, &selection, &assets, &mut report)
                .await?;
        }

        let handle = match cache.registry_handle() {
            Some(handle) => handle.clone(),
            None => self.init_registry(&mut cache, &selection, &assets).await?,
        };

        let mut keys = selection.all.clone();
        keys.sort();
        let commit = commit_lines(
            &mut cache,
            &self.cache,
            self.registry.as_ref(),
            &handle,
            &keys,
            CommitOptions::from(&self.config),
        )
        .await?;
        report.record_commit(commit);

        if report.success() {
            info!(uploaded = report.uploaded, groups = report.groups_written, "Run complete");
        } else {
            warn!(
                failed_uploads = report.failed_uploads.len(),
                groups_failed = report.groups_failed,
                groups_incomplete = report.groups_incomplete,
                "Run finished with failures, rerun to resume"
            );
        }
        Ok(report)
    }

    async fn upload_pending(
        &self,
        cache: &mut Cache,
        selection: &Selection,
        assets: &AssetMap,
        report: &mut RunReport,
    ) -> MintResult<()> {
        let mut planned = Vec::with_capacity(selection.pending.len());
        for index in &selection.pending {
            let Some(pair) = assets.get(index) else {
                warn!(index = %index, "Cached item has no image on disk");
                report.failed_uploads.push(FailedItem {
                    index: index.clone(),
                    reason: "no image on disk".to_string(),
                });
                continue;
            };
            match pair.image_size().await {
                Ok(size) => planned.push(PlannedItem::new(index.clone(), size)),
                Err(err) => {
                    warn!(index = %index, error = %err, "Cannot read image size");
                    report.failed_uploads.push(FailedItem {
                        index: index.clone(),
                        reason: format!("{}: {}", pair.image.display(), err),
                    });
                }
            }
        }

        // Planning covers every pending item before the first upload.
        let batches = plan_batches(&planned, self.uploader.strategy())?;
        info!(pending = planned.len(), batches = batches.len(), "Uploading pending items");

        for batch in &batches {
            let batch_report = self.uploader.upload_batch(batch, assets).await;

            if !batch_report.uploaded.is_empty() {
                for item in &batch_report.uploaded {
                    cache.record_upload(item.index.clone(), item.link.clone(), item.name.clone());
                }
                self.cache.save(cache).await?;

                if cache.registry_handle().is_none() {
                    self.init_registry(cache, selection, assets).await?;
                }
            }

            report.uploaded += batch_report.uploaded.len();
            report.failed_uploads.extend(batch_report.failed);
        }
        Ok(())
    }

    /// One-time registry initialization from the first item's manifest.
    /// Never retried; any failure aborts the run.
    async fn init_registry(
        &self,
        cache: &mut Cache,
        selection: &Selection,
        assets: &AssetMap,
    ) -> MintResult<RegistryHandle> {
        let first = selection
            .all
            .iter()
            .min()
            .ok_or_else(|| MintError::registry_init("no items to size the registry for"))?;
        let init = self.registry_params(first, selection.all.len(), assets).await?;

        let initialized = self.registry.init_registry(init).await.map_err(|err| match err {
            MintError::RegistryInit { .. } => err,
            other => MintError::registry_init(other.to_string()),
        })?;

        info!(registry = %initialized.handle, uuid = %initialized.uuid, "Registry initialized");
        let handle = initialized.handle.clone();
        cache.set_registry(initialized);
        self.cache.save(cache).await?;
        Ok(handle)
    }

    async fn registry_params(
        &self,
        first: &ItemIndex,
        item_count: usize,
        assets: &AssetMap,
    ) -> MintResult<RegistryInit> {
        let pair = assets.get(first).ok_or_else(|| {
            MintError::registry_init(format!("no manifest on disk for item {first}"))
        })?;
        let manifest = Manifest::load(&pair.manifest)
            .await
            .map_err(|err| MintError::invalid_manifest(first.as_str(), err.to_string()))?;
        manifest.validate_for_registry(first.as_str())?;

        let max_lines = u32::try_from(item_count)
            .map_err(|_| MintError::registry_init(format!("{item_count} items exceed the registry size")))?;

        Ok(RegistryInit {
            max_lines,
            symbol: manifest.symbol,
            royalty_bps: manifest.seller_fee_basis_points,
            mutable: self.config.mutable,
            retain_authority: self.config.retain_authority,
            creators: manifest
                .properties
                .creators
                .into_iter()
                .map(|creator| RegistryCreator {
                    address: creator.address,
                    verified: true,
                    share: creator.share,
                })
                .collect(),
        })
    }
}
