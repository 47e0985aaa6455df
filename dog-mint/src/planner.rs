//! Partitioning of pending items into upload batches.

use crate::{ItemIndex, MintError, MintResult};

/// Admission rule for a batch, chosen by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStrategy {
    /// At most `window` items per batch
    CountBounded { window: usize },
    /// Cumulative image size strictly below `limit` bytes
    SizeBounded { limit: u64 },
}

/// Pending item with its image size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub index: ItemIndex,
    pub size: u64,
}

impl PlannedItem {
    pub fn new(index: ItemIndex, size: u64) -> Self {
        Self { index, size }
    }
}

/// Non-empty, ordered run of pending items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub items: Vec<ItemIndex>,
    pub total_bytes: u64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split `items` into batches, keeping their order.
///
/// Size-bounded planning is greedy: a batch is closed right before adding
/// the item that would bring it to or over the limit. An item that reaches
/// the limit on its own can never be uploaded, which is reported before any
/// batch is returned.
pub fn plan_batches(items: &[PlannedItem], strategy: BatchStrategy) -> MintResult<Vec<Batch>> {
    match strategy {
        BatchStrategy::CountBounded { window } => Ok(items
            .chunks(window.max(1))
            .map(|chunk| Batch {
                items: chunk.iter().map(|item| item.index.clone()).collect(),
                total_bytes: chunk.iter().map(|item| item.size).sum(),
            })
            .collect()),
        BatchStrategy::SizeBounded { limit } => plan_by_size(items, limit),
    }
}

fn plan_by_size(items: &[PlannedItem], limit: u64) -> MintResult<Vec<Batch>> {
    if let Some(item) = items.iter().find(|item| item.size >= limit) {
        return Err(MintError::OversizedItem {
            index: item.index.to_string(),
            size: item.size,
            limit,
        });
    }

    let mut batches = Vec::new();
    let mut current = Batch {
        items: Vec::new(),
        total_bytes: 0,
    };

    for item in items {
        if !current.is_empty() && current.total_bytes + item.size >= limit {
            batches.push(std::mem::replace(
                &mut current,
                Batch {
                    items: Vec::new(),
                    total_bytes: 0,
                },
            ));
        }
        current.items.push(item.index.clone());
        current.total_bytes += item.size;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}
