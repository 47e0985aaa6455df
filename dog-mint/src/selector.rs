//! Work list computation: which items still need uploading.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::{AssetPair, Cache, ItemIndex, MintError, MintResult};

/// Outcome of comparing the files on disk with the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Every known index: cache keys first, then indices only seen on disk
    pub all: Vec<ItemIndex>,
    /// Subset of `all` without a link, same order
    pub pending: Vec<ItemIndex>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Indices of raw image paths; any malformed stem is fatal
pub fn indices_from_paths(paths: &[PathBuf]) -> MintResult<Vec<ItemIndex>> {
    paths.iter().map(|path| ItemIndex::from_path(path)).collect()
}

/// Compute the resumable work list. Pure: reads nothing, writes nothing.
pub fn select<'a, I>(files: I, cache: &Cache) -> Selection
where
    I: IntoIterator<Item = &'a ItemIndex>,
{
    let mut seen: HashSet<ItemIndex> = HashSet::new();
    let mut all = Vec::new();

    for index in cache.items.keys() {
        if seen.insert(index.clone()) {
            all.push(index.clone());
        }
    }
    for index in files {
        if seen.insert(index.clone()) {
            all.push(index.clone());
        }
    }

    let pending = all
        .iter()
        .filter(|index| !cache.has_link(index))
        .cloned()
        .collect();

    Selection { all, pending }
}

/// [`select`] over discovered asset pairs
pub fn select_assets(assets: &[AssetPair], cache: &Cache) -> Selection {
    select(assets.iter().map(|asset| &asset.index), cache)
}

/// Indices still lacking a link, cache order first
pub fn pending_items(assets: &[AssetPair], cache: &Cache) -> Vec<ItemIndex> {
    select_assets(assets, cache).pending
}

/// Every known index, cache order first
pub fn all_items(assets: &[AssetPair], cache: &Cache) -> Vec<ItemIndex> {
    select_assets(assets, cache).all
}

/// Require the indices to be exactly `0..n` in some order.
///
/// Registry lines are written to consecutive slots, so a gap would shift
/// every later item onto the wrong slot.
pub fn ensure_dense(indices: &[ItemIndex]) -> MintResult<()> {
    let mut sorted: Vec<&ItemIndex> = indices.iter().collect();
    sorted.sort();

    for (expected, index) in (0u32..).zip(sorted) {
        if index.position() != expected {
            return Err(MintError::IndexGap {
                expected,
                found: index.to_string(),
            });
        }
    }
    Ok(())
}
