//! Registry commits in fixed-size groups.
//!
//! Keys are split into outer chunks and each chunk into groups; a group is
//! one `write_lines` call. Groups whose members are all on chain are skipped,
//! which makes a rerun after partial failure pick up exactly the missing
//! groups.

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{Cache, CacheSlot};
use crate::config::MintConfig;
use crate::registry::{ConfigLine, Registry, RegistryHandle};
use crate::{ItemIndex, MintResult};

/// Group layout and write concurrency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    pub chunk_size: usize,
    pub group_size: usize,
    pub concurrency: usize,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            group_size: 10,
            concurrency: 10,
        }
    }
}

impl From<&MintConfig> for CommitOptions {
    fn from(config: &MintConfig) -> Self {
        Self {
            chunk_size: config.commit_chunk_size.max(1),
            group_size: config.commit_group_size.max(1),
            concurrency: config.commit_concurrency.max(1),
        }
    }
}

/// Group counts of one commit pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Groups written and marked on chain
    pub written: usize,
    /// Groups already fully on chain
    pub skipped: usize,
    /// Groups whose write failed
    pub failed: usize,
    /// Groups not written because a member has no link yet
    pub incomplete: usize,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.incomplete == 0
    }
}

struct GroupWrite {
    start: u32,
    members: Vec<ItemIndex>,
    lines: Vec<ConfigLine>,
}

fn lines_for(cache: &Cache, group: &[ItemIndex]) -> Option<Vec<ConfigLine>> {
    group
        .iter()
        .map(|index| {
            let entry = cache.entry(index)?;
            Some(ConfigLine {
                uri: entry.link()?.to_string(),
                name: entry.name.clone(),
            })
        })
        .collect()
}

/// Write every uncommitted group of `keys` to the registry.
///
/// Writes run concurrently; each result is applied to `cache` and persisted
/// before the next one is looked at. A failed write is logged and counted;
/// only a failure to persist the cache is returned as an error.
#[instrument(skip_all, fields(registry = %handle, keys = keys.len()))]
pub async fn commit_lines(
    cache: &mut Cache,
    slot: &CacheSlot,
    registry: &dyn Registry,
    handle: &RegistryHandle,
    keys: &[ItemIndex],
    options: CommitOptions,
) -> MintResult<CommitReport> {
    let mut report = CommitReport::default();
    let mut writes = Vec::new();

    for (chunk_no, chunk) in keys.chunks(options.chunk_size.max(1)).enumerate() {
        debug!(chunk = chunk_no, keys = chunk.len(), "Planning registry chunk");

        for group in chunk.chunks(options.group_size.max(1)) {
            if group.iter().all(|index| cache.is_on_chain(index)) {
                report.skipped += 1;
                continue;
            }

            match lines_for(cache, group) {
                Some(lines) => writes.push(GroupWrite {
                    start: group[0].position(),
                    members: group.to_vec(),
                    lines,
                }),
                None => {
                    warn!(start = %group[0], "Group has items without a link, not writing it");
                    report.incomplete += 1;
                }
            }
        }
    }

    let mut results = stream::iter(writes)
        .map(move |write| async move {
            let GroupWrite {
                start,
                members,
                lines,
            } = write;
            let result = registry.write_lines(handle, start, lines).await;
            (start, members, result)
        })
        .buffer_unordered(options.concurrency.max(1));

    while let Some((start, members, result)) = results.next().await {
        match result {
            Ok(()) => {
                for index in &members {
                    cache.mark_on_chain(index)?;
                }
                slot.save(cache).await?;
                report.written += 1;
                info!(start, lines = members.len(), "Registry lines written");
            }
            Err(err) => {
                error!(start, error = %err, "Registry write failed, group will be retried on the next run");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
