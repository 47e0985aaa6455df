//! Item discovery.
//!
//! A collection directory holds pairs of files sharing a stem: the image
//! (`7.png`) and its manifest (`7.json`). The stem is the item's index.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{MintError, MintResult};

/// Image extensions picked up by [`discover_assets`], with their MIME types
pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("mp4", "video/mp4"),
];

/// Index of an item, equal to its filename stem.
///
/// Always a canonical decimal (no sign, no leading zeros); the numeric value
/// is the item's position in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemIndex(String);

impl ItemIndex {
    pub fn parse<S: Into<String>>(raw: S) -> MintResult<Self> {
        let raw = raw.into();
        let digits = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
        let canonical = raw.len() == 1 || !raw.starts_with('0');
        if !digits || !canonical || raw.parse::<u32>().is_err() {
            return Err(MintError::MalformedItemName { path: raw });
        }
        Ok(Self(raw))
    }

    /// Derive the index from a file path's stem
    pub fn from_path(path: &Path) -> MintResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| MintError::MalformedItemName {
                path: path.display().to_string(),
            })?;

        Self::parse(stem).map_err(|_| MintError::MalformedItemName {
            path: path.display().to_string(),
        })
    }

    /// Registry position of this item
    pub fn position(&self) -> u32 {
        // Validated on construction.
        self.0.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for ItemIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.position().cmp(&other.position())
    }
}

impl PartialOrd for ItemIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for ItemIndex {
    type Error = MintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ItemIndex> for String {
    fn from(index: ItemIndex) -> Self {
        index.0
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An image and its manifest on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    pub index: ItemIndex,
    pub image: PathBuf,
    pub manifest: PathBuf,
}

impl AssetPair {
    /// Build a pair from an image path, expecting `<stem>.json` next to it
    pub fn from_image<P: Into<PathBuf>>(image: P) -> MintResult<Self> {
        let image = image.into();
        let index = ItemIndex::from_path(&image)?;
        let manifest = image.with_extension("json");
        Ok(Self {
            index,
            image,
            manifest,
        })
    }

    /// Lowercased image extension, empty when absent
    pub fn extension(&self) -> String {
        self.image
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// MIME type of the image, from its extension
    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.extension())
    }

    /// Size of the image in bytes
    pub async fn image_size(&self) -> MintResult<u64> {
        Ok(tokio::fs::metadata(&self.image).await?.len())
    }
}

/// MIME type for an image extension
pub fn content_type_for(extension: &str) -> &'static str {
    IMAGE_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_TYPES.iter().any(|(known, _)| known.eq_ignore_ascii_case(ext)))
}

/// Scan `dir` for image/manifest pairs, ordered by index.
///
/// A malformed image stem, a duplicate index or a missing manifest is fatal.
pub async fn discover_assets(dir: &Path) -> MintResult<Vec<AssetPair>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_image(&path) {
            continue;
        }

        let pair = AssetPair::from_image(path)?;
        if !seen.insert(pair.index.clone()) {
            return Err(MintError::MalformedItemName {
                path: pair.image.display().to_string(),
            });
        }
        if !tokio::fs::try_exists(&pair.manifest).await? {
            return Err(MintError::MissingManifest {
                index: pair.index.to_string(),
                path: pair.manifest.display().to_string(),
            });
        }
        pairs.push(pair);
    }

    pairs.sort_by(|a, b| a.index.cmp(&b.index));
    debug!(dir = %dir.display(), items = pairs.len(), "Discovered assets");
    Ok(pairs)
}
