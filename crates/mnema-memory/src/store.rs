//! Layered memory storage and ranked recall.
//!
//! ## Model
//!
//! Entries live in named layers ([`MemoryLayer`]) and carry an importance
//! score in `[0.0, 1.0]` (clamped on write, never rejected). Each entry
//! owns exactly one [`ContentGraph`] block of kind `Memory`, created in
//! the same call that creates the entry.
//!
//! ## Recall ranking
//!
//! [`MemoryStore::recall`] returns direct matches (tokenized
//! case-insensitive substring containment; an empty query matches every
//! entry) plus associative matches: entries whose block sits one hop from
//! a directly matched block over an edge of weight ≥ 0.5, in either
//! direction. Hits are ordered by importance (highest first), then
//! creation time (newest first), then direct before associative. Absence
//! of matches is an empty result, never an error.
//!
//! ## Capacity
//!
//! With a configured capacity, storing into a full store evicts the
//! lowest-importance entry of the *same* layer (oldest on ties) together
//! with its block and the block's edges. A full store whose target layer
//! holds nothing to evict refuses the write with
//! [`MnemaError::CapacityExceeded`].

use chrono::{DateTime, Utc};
use mnema_graph::{BlockId, ContentGraph};
use mnema_types::{MemoryLayer, MnemaError, NodeKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum edge weight for an association to be followed during recall.
pub const ASSOCIATION_THRESHOLD: f64 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// MemoryEntry
// ─────────────────────────────────────────────────────────────────────────────

/// A single stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier for this memory.
    pub id: Uuid,
    /// The remembered text.
    pub content: String,
    /// Layer this entry lives in.
    pub layer: MemoryLayer,
    /// Retention score in `[0.0, 1.0]`; higher ranks earlier in recall
    /// and survives eviction longer.
    pub importance: f64,
    /// Dominant emotion label at storage time, when one was supplied.
    pub emotional_tag: Option<String>,
    /// Wall-clock creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// The graph block materialized for this entry.
    pub block: BlockId,
}

/// One recall result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallHit {
    /// The matched entry.
    pub entry: MemoryEntry,
    /// `false` for a direct text match, `true` for a hit reached over an
    /// association edge.
    pub associative: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// Layered in-memory entry store.
///
/// Holds no lock of its own; the cognitive façade serializes access and
/// passes the shared [`ContentGraph`] into each operation so entry and
/// block mutations land together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that holds at most `capacity` entries across all
    /// layers. A capacity of 0 refuses every write.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: Some(capacity),
        }
    }

    /// Store a new memory and materialize its graph block.
    ///
    /// Empty (or whitespace-only) content is rejected with
    /// [`MnemaError::InvalidInput`]. Importance is clamped to
    /// `[0.0, 1.0]`. When the store is at capacity the lowest-importance
    /// entry of `layer` is evicted first (oldest on ties), cascading its
    /// block; if `layer` has no entry to evict the write fails with
    /// [`MnemaError::CapacityExceeded`] and nothing changes.
    pub fn remember(
        &mut self,
        content: &str,
        layer: MemoryLayer,
        importance: f64,
        emotional_tag: Option<String>,
        now: DateTime<Utc>,
        graph: &mut ContentGraph,
    ) -> Result<MemoryEntry, MnemaError> {
        if content.trim().is_empty() {
            return Err(MnemaError::InvalidInput(
                "memory content must not be empty".to_string(),
            ));
        }

        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity {
                self.evict_one(&layer, graph)?;
            }
        }

        let id = Uuid::new_v4();
        let block = graph.add_entry_block(content.to_string(), NodeKind::Memory, id);
        let entry = MemoryEntry {
            id,
            content: content.to_string(),
            layer,
            importance: importance.clamp(0.0, 1.0),
            emotional_tag,
            created_at: now,
            block,
        };
        tracing::debug!(id = %entry.id, layer = %entry.layer, importance = entry.importance, "memory stored");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove the lowest-importance (oldest on ties) entry of `layer`.
    fn evict_one(&mut self, layer: &MemoryLayer, graph: &mut ContentGraph) -> Result<(), MnemaError> {
        let victim = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| &e.layer == layer)
            .min_by(|(_, a), (_, b)| {
                a.importance
                    .total_cmp(&b.importance)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            })
            .map(|(i, _)| i);

        let Some(index) = victim else {
            return Err(MnemaError::CapacityExceeded(format!(
                "store is full and layer {layer} holds no evictable entry"
            )));
        };

        let evicted = self.entries.remove(index);
        // The block may already be gone if callers removed it directly.
        let _ = graph.remove_block(evicted.block);
        tracing::debug!(id = %evicted.id, layer = %evicted.layer, "memory evicted");
        Ok(())
    }

    /// Look up one entry by id.
    pub fn entry(&self, id: Uuid) -> Result<&MemoryEntry, MnemaError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| MnemaError::NotFound(format!("memory {id}")))
    }

    /// Look up the entry that owns a given graph block.
    pub fn entry_for_block(&self, block: BlockId) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.block == block)
    }

    /// Ranked recall over the store.
    ///
    /// `layer = None` searches every layer. `min_importance` filters both
    /// direct and associative hits. `limit = 0` means unlimited.
    pub fn recall(
        &self,
        query: &str,
        layer: Option<&MemoryLayer>,
        limit: usize,
        min_importance: f64,
        graph: &ContentGraph,
    ) -> Vec<RecallHit> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let admitted = |entry: &MemoryEntry| {
            entry.importance >= min_importance && layer.is_none_or(|l| &entry.layer == l)
        };

        let mut hits: Vec<RecallHit> = Vec::new();
        let mut direct_blocks: Vec<BlockId> = Vec::new();

        for entry in &self.entries {
            if !admitted(entry) {
                continue;
            }
            let content = entry.content.to_lowercase();
            if tokens.is_empty() || tokens.iter().any(|t| content.contains(t)) {
                direct_blocks.push(entry.block);
                hits.push(RecallHit {
                    entry: entry.clone(),
                    associative: false,
                });
            }
        }

        // One-hop associative expansion over strong edges.
        if !tokens.is_empty() {
            for &block in &direct_blocks {
                for neighbor in graph.neighbors_above(block, ASSOCIATION_THRESHOLD) {
                    let Some(entry) = self.entry_for_block(neighbor) else {
                        continue;
                    };
                    if !admitted(entry) || hits.iter().any(|h| h.entry.id == entry.id) {
                        continue;
                    }
                    hits.push(RecallHit {
                        entry: entry.clone(),
                        associative: true,
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            b.entry
                .importance
                .total_cmp(&a.entry.importance)
                .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
                .then_with(|| a.associative.cmp(&b.associative))
        });
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    /// All entries of one layer, insertion order.
    pub fn layer_entries(&self, layer: &MemoryLayer) -> Vec<&MemoryEntry> {
        self.entries.iter().filter(|e| &e.layer == layer).collect()
    }

    /// Number of stored entries across all layers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
