pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::MintResult;

/// Opaque id of the registry config object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryHandle(pub String);

impl RegistryHandle {
    pub fn new<S: Into<String>>(handle: S) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creator entry recorded on the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCreator {
    pub address: String,
    pub verified: bool,
    pub share: u8,
}

/// Parameters of the one-time registry initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInit {
    pub max_lines: u32,
    pub symbol: String,
    pub royalty_bps: u16,
    pub mutable: bool,
    pub retain_authority: bool,
    pub creators: Vec<RegistryCreator>,
}

/// Outcome of a successful initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInitialized {
    pub handle: RegistryHandle,
    pub uuid: String,
}

/// One `(uri, name)` line written to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLine {
    pub uri: String,
    pub name: String,
}

/// External registry the uploaded links are committed to.
///
/// Implementations own their signing credentials and RPC connection; the
/// pipeline only sees handles and lines.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Create the registry config object. Called at most once per collection.
    async fn init_registry(&self, init: RegistryInit) -> MintResult<RegistryInitialized>;

    /// Write `lines` into consecutive slots starting at `start_index`.
    /// Rewriting the same slots with the same lines must be harmless.
    async fn write_lines(
        &self,
        handle: &RegistryHandle,
        start_index: u32,
        lines: Vec<ConfigLine>,
    ) -> MintResult<()>;

    /// Public identity of the authority the registry writes with
    fn authority(&self) -> String;
}
