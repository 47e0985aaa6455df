//! Per-item JSON manifests.
//!
//! Only the fields the pipeline reads or patches are typed; everything else
//! is carried through untouched so re-uploaded manifests keep their content.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{MintError, MintResult};

/// Upper bound on royalties, in basis points
pub const MAX_ROYALTY_BPS: u16 = 10_000;

/// Most creators a registry entry may list
pub const MAX_CREATORS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default)]
    pub uri: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Manifest document of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub seller_fee_basis_points: u16,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> MintResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read and parse a manifest file
    pub async fn load(path: &Path) -> MintResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_slice(&bytes)
    }

    pub fn to_vec(&self) -> MintResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Point the manifest at its uploaded image.
    ///
    /// `image` becomes `link`. File entries that referenced the previous
    /// image are rewritten; when none did, an entry for the link is added.
    pub fn with_image_link(mut self, link: &str, content_type: &str) -> Self {
        let previous = std::mem::replace(&mut self.image, link.to_string());

        let mut rewritten = false;
        for file in &mut self.properties.files {
            if file.uri == previous || file.uri.is_empty() {
                file.uri = link.to_string();
                rewritten = true;
            }
        }

        if !rewritten {
            self.properties.files.push(ManifestFile {
                uri: link.to_string(),
                file_type: Some(content_type.to_string()),
                extra: Map::new(),
            });
        }
        self
    }

    /// Check the fields a registry is initialized from
    pub fn validate_for_registry(&self, index: &str) -> MintResult<()> {
        if self.seller_fee_basis_points > MAX_ROYALTY_BPS {
            return Err(MintError::invalid_manifest(
                index,
                format!(
                    "seller_fee_basis_points {} exceeds {}",
                    self.seller_fee_basis_points, MAX_ROYALTY_BPS
                ),
            ));
        }

        let creators = &self.properties.creators;
        if creators.len() > MAX_CREATORS {
            return Err(MintError::invalid_manifest(
                index,
                format!("{} creators listed, at most {} allowed", creators.len(), MAX_CREATORS),
            ));
        }

        if !creators.is_empty() {
            let total: u32 = creators.iter().map(|c| u32::from(c.share)).sum();
            if total != 100 {
                return Err(MintError::invalid_manifest(
                    index,
                    format!("creator shares add up to {total}, expected 100"),
                ));
            }
        }

        Ok(())
    }
}
