//! Weighted content multigraph.
//!
//! # Model
//!
//! Blocks live in an arena keyed by [`BlockId`], an opaque integer assigned
//! monotonically for the lifetime of the graph instance. Edges are stored
//! directed (`from → to`) in a flat list; the same ordered pair may appear
//! any number of times, each occurrence an independent association
//! (repeated co-occurrence strengthens a path by adding edges, not by
//! mutating one edge's weight). Association is symmetric, so neighborhood
//! queries traverse edges in both directions.
//!
//! Deleting a block cascade-deletes its incident edges; an edge can never
//! outlive either endpoint.
//!
//! # Example
//!
//! ```rust
//! use mnema_graph::ContentGraph;
//! use mnema_types::NodeKind;
//!
//! let mut graph = ContentGraph::new();
//! let rust = graph.add_block("Rust is fast".to_string(), NodeKind::Text);
//! let speed = graph.add_block("speed matters".to_string(), NodeKind::Text);
//! graph.connect(rust, speed, 0.8).unwrap();
//!
//! assert_eq!(graph.stats().connections, 1);
//! assert_eq!(graph.neighbors_above(rust, 0.5), vec![speed]);
//! ```

use chrono::{DateTime, Utc};
use mnema_types::{MnemaError, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// BlockId
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier of a content block, unique for the graph's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Block & Edge
// ─────────────────────────────────────────────────────────────────────────────

/// A single content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Arena identifier.
    pub id: BlockId,
    /// Text or binary-derived description.
    pub content: String,
    /// Category tag.
    pub kind: NodeKind,
    /// Creation time (UTC), set once.
    pub created_at: DateTime<Utc>,
    /// Weak back-reference to the memory entry this block was materialized
    /// from, if any. Staleness is detected by entry lookup, never assumed.
    pub entry: Option<Uuid>,
}

/// A weighted directed association between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    /// Association strength, non-negative (clamped on insert).
    pub weight: f64,
}

/// Aggregate graph counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub blocks: usize,
    pub connections: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// ContentGraph
// ─────────────────────────────────────────────────────────────────────────────

/// Arena-backed weighted content multigraph.
///
/// Not internally synchronized; the cognitive façade serializes access.
#[derive(Debug, Default)]
pub struct ContentGraph {
    blocks: HashMap<BlockId, Block>,
    edges: Vec<Edge>,
    next_id: u64,
}

impl ContentGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block. Always succeeds; the returned id is unique for this
    /// graph's lifetime.
    pub fn add_block(&mut self, content: String, kind: NodeKind) -> BlockId {
        self.insert(content, kind, None)
    }

    /// Add a block carrying a back-reference to the memory entry it was
    /// materialized from.
    pub fn add_entry_block(&mut self, content: String, kind: NodeKind, entry: Uuid) -> BlockId {
        self.insert(content, kind, Some(entry))
    }

    fn insert(&mut self, content: String, kind: NodeKind, entry: Option<Uuid>) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        self.blocks.insert(
            id,
            Block {
                id,
                content,
                kind,
                created_at: Utc::now(),
                entry,
            },
        );
        tracing::debug!(block = %id, "content block added");
        id
    }

    /// Look up a block by id.
    ///
    /// # Errors
    ///
    /// Returns [`MnemaError::NotFound`] if no block has this id.
    pub fn get_block(&self, id: BlockId) -> Result<&Block, MnemaError> {
        self.blocks
            .get(&id)
            .ok_or_else(|| MnemaError::NotFound(format!("block {id}")))
    }

    /// Connect two blocks with an association of the given strength.
    ///
    /// Duplicate edges between the same pair are allowed and independent.
    /// Negative weights are clamped to zero.
    ///
    /// # Errors
    ///
    /// Returns [`MnemaError::NotFound`] if either endpoint does not exist;
    /// the graph is left unchanged in that case.
    pub fn connect(&mut self, from: BlockId, to: BlockId, weight: f64) -> Result<(), MnemaError> {
        if !self.blocks.contains_key(&from) {
            return Err(MnemaError::NotFound(format!("block {from}")));
        }
        if !self.blocks.contains_key(&to) {
            return Err(MnemaError::NotFound(format!("block {to}")));
        }
        self.edges.push(Edge {
            from,
            to,
            weight: weight.max(0.0),
        });
        Ok(())
    }

    /// Remove a block, cascade-deleting every incident edge.
    ///
    /// # Errors
    ///
    /// Returns [`MnemaError::NotFound`] if no block has this id.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, MnemaError> {
        let block = self
            .blocks
            .remove(&id)
            .ok_or_else(|| MnemaError::NotFound(format!("block {id}")))?;
        self.edges.retain(|e| e.from != id && e.to != id);
        tracing::debug!(block = %id, "content block removed");
        Ok(block)
    }

    /// Current block and connection counts. Idempotent between mutations.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            blocks: self.blocks.len(),
            connections: self.edges.len(),
        }
    }

    /// Ids of all blocks reachable from `id` over one edge (either
    /// direction) whose weight is at least `min_weight`.
    ///
    /// Parallel edges count as their strongest member. The result is
    /// deduplicated and sorted by id for determinism; `id` itself is never
    /// included (self-loops are ignored).
    pub fn neighbors_above(&self, id: BlockId, min_weight: f64) -> Vec<BlockId> {
        let mut best: HashMap<BlockId, f64> = HashMap::new();
        for edge in &self.edges {
            let other = if edge.from == id {
                edge.to
            } else if edge.to == id {
                edge.from
            } else {
                continue;
            };
            if other == id {
                continue;
            }
            let entry = best.entry(other).or_insert(edge.weight);
            if edge.weight > *entry {
                *entry = edge.weight;
            }
        }
        let mut out: Vec<BlockId> = best
            .into_iter()
            .filter(|(_, w)| *w >= min_weight)
            .map(|(b, _)| b)
            .collect();
        out.sort_unstable();
        out
    }

    /// All blocks of the given kind.
    pub fn blocks_of_kind(&self, kind: &NodeKind) -> Vec<&Block> {
        self.blocks.values().filter(|b| &b.kind == kind).collect()
    }

    /// Case-insensitive substring search over block content, most recent
    /// first.
    pub fn search(&self, needle: &str) -> Vec<&Block> {
        let needle = needle.to_lowercase();
        let mut hits: Vec<&Block> = self
            .blocks
            .values()
            .filter(|b| b.content.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the graph holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
