use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::registry::{
    ConfigLine, Registry, RegistryHandle, RegistryInit, RegistryInitialized,
};
use crate::{MintError, MintResult};

#[derive(Debug, Clone)]
struct RegistryState {
    init: RegistryInit,
    lines: BTreeMap<u32, ConfigLine>,
}

/// In-process registry for tests and dry runs
#[derive(Clone)]
pub struct MemoryRegistry {
    authority: String,
    registries: Arc<RwLock<HashMap<RegistryHandle, RegistryState>>>,
    inits: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl MemoryRegistry {
    pub fn new<S: Into<String>>(authority: S) -> Self {
        Self {
            authority: authority.into(),
            registries: Arc::new(RwLock::new(HashMap::new())),
            inits: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `init_registry` calls
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    /// Number of successful `write_lines` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Lines recorded for a handle, by slot
    pub fn lines(&self, handle: &RegistryHandle) -> BTreeMap<u32, ConfigLine> {
        self.registries
            .read()
            .get(handle)
            .map(|state| state.lines.clone())
            .unwrap_or_default()
    }

    /// Parameters a handle was initialized with
    pub fn init_params(&self, handle: &RegistryHandle) -> Option<RegistryInit> {
        self.registries.read().get(handle).map(|state| state.init.clone())
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new("memory-authority")
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn init_registry(&self, init: RegistryInit) -> MintResult<RegistryInitialized> {
        let handle = RegistryHandle::new(Uuid::new_v4().simple().to_string());
        let uuid = handle.as_str()[..6].to_string();

        self.registries.write().insert(
            handle.clone(),
            RegistryState {
                init,
                lines: BTreeMap::new(),
            },
        );
        self.inits.fetch_add(1, Ordering::SeqCst);

        Ok(RegistryInitialized { handle, uuid })
    }

    async fn write_lines(
        &self,
        handle: &RegistryHandle,
        start_index: u32,
        lines: Vec<ConfigLine>,
    ) -> MintResult<()> {
        let mut registries = self.registries.write();
        let state = registries
            .get_mut(handle)
            .ok_or_else(|| MintError::registry(format!("Unknown registry {}", handle)))?;

        let end = u64::from(start_index) + lines.len() as u64;
        if end > u64::from(state.init.max_lines) {
            return Err(MintError::registry(format!(
                "Lines {}..{} exceed capacity {}",
                start_index, end, state.init.max_lines
            )));
        }

        let count = lines.len();
        for (slot, line) in (start_index..).zip(lines) {
            state.lines.insert(slot, line);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(%handle, start_index, count, "Recorded registry lines");
        Ok(())
    }

    fn authority(&self) -> String {
        self.authority.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(max_lines: u32) -> RegistryInit {
        RegistryInit {
            max_lines,
            symbol: "DOG".to_string(),
            royalty_bps: 500,
            mutable: true,
            retain_authority: true,
            creators: Vec::new(),
        }
    }

    fn line(i: u32) -> ConfigLine {
        ConfigLine {
            uri: format!("https://arweave.net/{i}"),
            name: format!("Dog #{i}"),
        }
    }

    #[tokio::test]
    async fn writes_land_in_consecutive_slots() {
        let registry = MemoryRegistry::default();
        let created = registry.init_registry(init(20)).await.unwrap();
        assert_eq!(created.uuid.len(), 6);

        tokio_test::assert_ok!(
            registry
                .write_lines(&created.handle, 10, vec![line(10), line(11)])
                .await
        );

        let lines = registry.lines(&created.handle);
        assert_eq!(lines.keys().copied().collect::<Vec<_>>(), vec![10, 11]);
        assert_eq!(lines[&11].name, "Dog #11");
        assert_eq!(registry.write_count(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_handle_and_overflow() {
        let registry = MemoryRegistry::default();
        let created = registry.init_registry(init(2)).await.unwrap();

        let overflow = registry
            .write_lines(&created.handle, 1, vec![line(1), line(2)])
            .await;
        tokio_test::assert_err!(overflow);

        let unknown = registry
            .write_lines(&RegistryHandle::new("nope"), 0, vec![line(0)])
            .await;
        tokio_test::assert_err!(unknown);
        assert_eq!(registry.write_count(), 0);
    }
}
