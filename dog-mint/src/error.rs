use dog_blob::BlobError;
use thiserror::Error;

/// Result type for pipeline operations
pub type MintResult<T> = Result<T, MintError>;

/// Errors raised by the upload pipeline.
///
/// Variants for which [`MintError::is_fatal`] returns true abort a run;
/// the rest are recorded per item or per registry group.
#[derive(Error, Debug)]
pub enum MintError {
    #[error("Malformed item name: {path} (file stem must be a decimal index)")]
    MalformedItemName { path: String },

    #[error("Item indices must run from 0 without gaps: expected {expected}, found {found}")]
    IndexGap { expected: u32, found: String },

    #[error("Item {index} has no manifest at {path}")]
    MissingManifest { index: String, path: String },

    #[error("Item {index} is {size} bytes, at or above the bundle limit of {limit} bytes")]
    OversizedItem { index: String, size: u64, limit: u64 },

    #[error("Invalid manifest for item {index}: {reason}")]
    InvalidManifest { index: String, reason: String },

    #[error("Registry initialization failed: {reason}")]
    RegistryInit { reason: String },

    #[error("Registry error: {reason}")]
    Registry { reason: String },

    #[error("Cache error: {reason}")]
    Cache { reason: String },

    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: BlobError,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl MintError {
    pub fn registry<S: Into<String>>(reason: S) -> Self {
        Self::Registry {
            reason: reason.into(),
        }
    }

    pub fn registry_init<S: Into<String>>(reason: S) -> Self {
        Self::RegistryInit {
            reason: reason.into(),
        }
    }

    pub fn cache<S: Into<String>>(reason: S) -> Self {
        Self::Cache {
            reason: reason.into(),
        }
    }

    pub fn config<K: Into<String>, S: Into<String>>(key: K, reason: S) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_manifest<I: Into<String>, S: Into<String>>(index: I, reason: S) -> Self {
        Self::InvalidManifest {
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run.
    ///
    /// Storage, I/O and serialization errors are scoped to the item or batch
    /// that produced them; registry write errors to their group.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedItemName { .. }
                | Self::IndexGap { .. }
                | Self::MissingManifest { .. }
                | Self::OversizedItem { .. }
                | Self::InvalidManifest { .. }
                | Self::RegistryInit { .. }
                | Self::Cache { .. }
                | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fatal_errors() {
        assert!(MintError::registry_init("rpc down").is_fatal());
        assert!(MintError::OversizedItem {
            index: "0".into(),
            size: 10,
            limit: 10
        }
        .is_fatal());
        assert!(!MintError::registry("timeout").is_fatal());
        assert!(!MintError::from(BlobError::upload_failed("503")).is_fatal());
    }
}
