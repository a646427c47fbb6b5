//! The cognitive façade.
//!
//! ## Concurrency
//!
//! All engine state lives in one `Inner` behind a single
//! [`parking_lot::Mutex`]. Operations that touch several engines (storing
//! a memory and materializing its block, ingesting an image and linking
//! it into the graph) hold the lock for the whole sequence, so no caller
//! can observe an entry without its block or a record without its links.
//! Nothing blocks beyond the lock itself; there are no background
//! threads.
//!
//! ## Wire shape
//!
//! The façade accepts the permissive inputs external callers send:
//! layers and emotions as strings, limits as signed integers (`0` means
//! unlimited, negative is rejected), importances clamped rather than
//! rejected. Bad media never fails an operation; [`CognitiveStore::see`]
//! folds analysis failures into a structured [`SeeOutcome`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnema_emotion::{EmotionEngine, EmotionSnapshot, TextAffect};
use mnema_graph::{Block, BlockId, ContentGraph, GraphStats};
use mnema_memory::{MemoryEntry, MemoryStore, RecallHit};
use mnema_types::{Emotion, MemoryLayer, MnemaError, NodeKind, VisualAnalysis};
use mnema_vision::{VisionBuffer, VisionStats, VisualRecord};

/// Edge weight used when linking a visual block to context-relevant
/// prior blocks.
const CONTEXT_LINK_WEIGHT: f64 = 0.7;

/// Edge weight between a visual block and its own memory entry's block.
const ENTRY_LINK_WEIGHT: f64 = 0.9;

/// Context search hits linked per ingested image.
const CONTEXT_LINK_FANOUT: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunable parameters for a [`CognitiveStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum memory entries across all layers; 0 means unbounded.
    pub memory_capacity: usize,
    /// Blend retention `r` for emotional updates.
    pub emotion_retention: f64,
    /// Per-second emotional decay factor `d`.
    pub emotion_decay_per_sec: f64,
    /// Raw image payloads retained alongside visual records.
    pub payload_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 0,
            emotion_retention: mnema_emotion::engine::DEFAULT_RETENTION,
            emotion_decay_per_sec: mnema_emotion::engine::DEFAULT_DECAY_PER_SEC,
            payload_retention: mnema_vision::ingest::DEFAULT_PAYLOAD_RETENTION,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Read-out shapes
// ─────────────────────────────────────────────────────────────────────────────

/// Structured result of a [`CognitiveStore::see`] call.
///
/// Bad media is reported here with `success = false`; a transport-level
/// error never carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeeOutcome {
    /// Whether the payload was accepted.
    pub success: bool,
    /// Id of the visual record (existing one on dedup).
    pub id: Option<Uuid>,
    /// `true` when the payload matched a stored record by hash.
    pub deduplicated: bool,
    /// Header analysis, present on success.
    pub analysis: Option<VisualAnalysis>,
    /// Memory entry created for the image, when one was requested.
    pub memory_entry: Option<Uuid>,
    /// Failure description. Set when the ingestion itself failed
    /// (`success = false`) or when a requested memory link could not be
    /// made (`success = true` with no `memory_entry`).
    pub error: Option<String>,
}

impl SeeOutcome {
    fn failure(error: &MnemaError) -> Self {
        Self {
            success: false,
            id: None,
            deduplicated: false,
            analysis: None,
            memory_entry: None,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate vision read-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionStatus {
    /// Traffic and retention counters.
    pub stats: VisionStats,
    /// `true` once at least one visual record is linked into the graph.
    pub graph_connected: bool,
}

/// Combined state read-out for observability endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveState {
    /// Decayed emotional state.
    pub emotion: EmotionSnapshot,
    /// Memory entries currently stored.
    pub memories: usize,
    /// Graph block and connection counts.
    pub graph: GraphStats,
    /// Vision counters.
    pub vision: VisionStats,
}

// ─────────────────────────────────────────────────────────────────────────────
// CognitiveStore
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    memory: MemoryStore,
    graph: ContentGraph,
    emotion: EmotionEngine,
    vision: VisionBuffer,
}

/// The composed cognitive store.
pub struct CognitiveStore {
    inner: Mutex<Inner>,
}

impl Default for CognitiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CognitiveStore {
    /// Create a store with default parameters.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store from explicit parameters.
    pub fn with_config(config: StoreConfig) -> Self {
        let memory = if config.memory_capacity == 0 {
            MemoryStore::new()
        } else {
            MemoryStore::with_capacity(config.memory_capacity)
        };
        Self {
            inner: Mutex::new(Inner {
                memory,
                graph: ContentGraph::new(),
                emotion: EmotionEngine::new()
                    .with_retention(config.emotion_retention)
                    .with_decay_per_sec(config.emotion_decay_per_sec),
                vision: VisionBuffer::new().with_payload_retention(config.payload_retention),
            }),
        }
    }

    // ── Memory ──────────────────────────────────────────────────────────────

    /// Store a memory. The layer name is parsed permissively; an empty
    /// name selects the working layer.
    pub fn remember(
        &self,
        content: &str,
        layer: &str,
        importance: f64,
        emotional_tag: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<MemoryEntry, MnemaError> {
        let mut inner = self.inner.lock();
        let Inner { memory, graph, .. } = &mut *inner;
        memory.remember(
            content,
            MemoryLayer::parse(layer),
            importance,
            emotional_tag,
            now,
            graph,
        )
    }

    /// Ranked recall. An empty `layer` searches every layer; `limit = 0`
    /// means unlimited and a negative limit is rejected.
    pub fn recall(
        &self,
        query: &str,
        layer: &str,
        limit: i64,
        min_importance: f64,
    ) -> Result<Vec<RecallHit>, MnemaError> {
        let limit = wire_limit(limit)?;
        let layer = (!layer.is_empty()).then(|| MemoryLayer::parse(layer));
        let inner = self.inner.lock();
        Ok(inner
            .memory
            .recall(query, layer.as_ref(), limit, min_importance, &inner.graph))
    }

    /// Look up one memory entry by id.
    pub fn memory(&self, id: Uuid) -> Result<MemoryEntry, MnemaError> {
        self.inner.lock().memory.entry(id).cloned()
    }

    // ── Emotion ─────────────────────────────────────────────────────────────

    /// Blend named emotional deltas into the state. Unknown emotion
    /// names are rejected with [`MnemaError::InvalidInput`] before any
    /// state changes.
    pub fn feel(
        &self,
        deltas: &[(String, f64)],
        trigger: &str,
        now: DateTime<Utc>,
    ) -> Result<(Emotion, f64), MnemaError> {
        let mut parsed = Vec::with_capacity(deltas.len());
        for (name, value) in deltas {
            let emotion = Emotion::parse(name)
                .ok_or_else(|| MnemaError::InvalidInput(format!("unknown emotion {name:?}")))?;
            parsed.push((emotion, *value));
        }
        Ok(self.inner.lock().emotion.feel(&parsed, trigger, now))
    }

    /// Classify free text and blend the result into the emotional state.
    pub fn process_text(&self, text: &str, now: DateTime<Utc>) -> TextAffect {
        self.inner.lock().emotion.feel_text(text, now)
    }

    /// Decayed emotional snapshot.
    pub fn emotional_state(&self, now: DateTime<Utc>) -> EmotionSnapshot {
        self.inner.lock().emotion.snapshot(now)
    }

    /// Combined observability read-out.
    pub fn cognitive_state(&self, now: DateTime<Utc>) -> CognitiveState {
        let mut inner = self.inner.lock();
        let emotion = inner.emotion.snapshot(now);
        CognitiveState {
            emotion,
            memories: inner.memory.len(),
            graph: inner.graph.stats(),
            vision: inner.vision.stats().clone(),
        }
    }

    // ── Graph ───────────────────────────────────────────────────────────────

    /// Add a free-standing content block. The kind name is parsed
    /// permissively; an empty name selects `Text`.
    pub fn add_block(&self, content: &str, kind: &str) -> BlockId {
        self.inner
            .lock()
            .graph
            .add_block(content.to_string(), NodeKind::parse(kind))
    }

    /// Look up one block by id.
    pub fn get_block(&self, id: u64) -> Result<Block, MnemaError> {
        self.inner.lock().graph.get_block(BlockId(id)).cloned()
    }

    /// Connect two blocks. Fails with [`MnemaError::NotFound`] and
    /// changes nothing when either endpoint is missing.
    pub fn connect(&self, from: u64, to: u64, weight: f64) -> Result<(), MnemaError> {
        self.inner
            .lock()
            .graph
            .connect(BlockId(from), BlockId(to), weight)
    }

    /// Graph block and connection counts. Idempotent.
    pub fn graph_stats(&self) -> GraphStats {
        self.inner.lock().graph.stats()
    }

    // ── Vision ──────────────────────────────────────────────────────────────

    /// Ingest one image payload.
    ///
    /// With `store_in_memory`, a `LongTerm` memory entry is created for
    /// the image together with an `Image` block linked to the entry's
    /// block; the image block is additionally connected (weight 0.7) to
    /// the blocks of up to three prior memories matching `context`.
    pub fn see(
        &self,
        data: &[u8],
        description: Option<String>,
        context: Option<String>,
        importance: f64,
        store_in_memory: bool,
        now: DateTime<Utc>,
    ) -> SeeOutcome {
        let mut inner = self.inner.lock();
        let Inner {
            memory,
            graph,
            vision,
            ..
        } = &mut *inner;

        let receipt = match vision.ingest(data, description.clone(), context.clone(), importance, now)
        {
            Ok(receipt) => receipt,
            Err(error) => {
                tracing::debug!(%error, "image payload rejected");
                return SeeOutcome::failure(&error);
            }
        };

        if receipt.deduplicated {
            let memory_entry = vision
                .record(receipt.id)
                .ok()
                .and_then(|record| record.entry);
            return SeeOutcome {
                success: true,
                id: Some(receipt.id),
                deduplicated: true,
                analysis: Some(receipt.analysis),
                memory_entry,
                error: None,
            };
        }

        let mut memory_entry = None;
        let mut link_error = None;
        if store_in_memory {
            match Self::link_into_memory(
                memory,
                graph,
                vision,
                receipt.id,
                &receipt.analysis,
                description.as_deref(),
                context.as_deref(),
                importance,
                now,
            ) {
                Ok(entry_id) => memory_entry = Some(entry_id),
                Err(error) => {
                    tracing::warn!(%error, id = %receipt.id, "visual memory not linked");
                    link_error = Some(format!("memory link failed: {error}"));
                }
            }
        }

        SeeOutcome {
            success: true,
            id: Some(receipt.id),
            deduplicated: false,
            analysis: Some(receipt.analysis),
            memory_entry,
            error: link_error,
        }
    }

    /// Create the memory entry and graph linkage for a fresh record.
    #[allow(clippy::too_many_arguments)]
    fn link_into_memory(
        memory: &mut MemoryStore,
        graph: &mut ContentGraph,
        vision: &mut VisionBuffer,
        record_id: Uuid,
        analysis: &VisualAnalysis,
        description: Option<&str>,
        context: Option<&str>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<Uuid, MnemaError> {
        let summary = match description {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => format!(
                "Visual memory: {} image {}x{}",
                analysis.format, analysis.width, analysis.height
            ),
        };

        let entry = memory.remember(
            &summary,
            MemoryLayer::LongTerm,
            importance,
            None,
            now,
            graph,
        )?;

        let image_block = graph.add_block(
            format!("{summary}\nhash: {}", analysis.hash),
            NodeKind::Image,
        );
        graph.connect(image_block, entry.block, ENTRY_LINK_WEIGHT)?;

        if let Some(context) = context {
            let related: Vec<BlockId> = graph
                .search(context)
                .into_iter()
                .filter(|b| b.id != image_block && b.id != entry.block)
                .take(CONTEXT_LINK_FANOUT)
                .map(|b| b.id)
                .collect();
            for target in related {
                graph.connect(image_block, target, CONTEXT_LINK_WEIGHT)?;
            }
        }

        vision.set_block(record_id, image_block)?;
        vision.set_entry(record_id, entry.id)?;
        Ok(entry.id)
    }

    /// Aggregate vision counters.
    pub fn vision_status(&self) -> VisionStatus {
        let inner = self.inner.lock();
        let graph_connected = inner
            .vision
            .visual_memories(0, 0.0, false)
            .iter()
            .any(|r| r.block.is_some());
        VisionStatus {
            stats: inner.vision.stats().clone(),
            graph_connected,
        }
    }

    /// Ranked visual-memory query; `recent_only` switches to pure
    /// recency. `limit = 0` means unlimited and a negative limit is
    /// rejected.
    pub fn visual_memories(
        &self,
        limit: i64,
        min_importance: f64,
        recent_only: bool,
    ) -> Result<Vec<VisualRecord>, MnemaError> {
        let limit = wire_limit(limit)?;
        Ok(self
            .inner
            .lock()
            .vision
            .visual_memories(limit, min_importance, recent_only)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Mark a visual record processed. Returns `false` for unknown ids.
    pub fn mark_processed(&self, id: Uuid) -> bool {
        self.inner.lock().vision.mark_processed(id)
    }
}

/// Validate a wire-shaped limit: 0 means unlimited, negative is invalid.
fn wire_limit(limit: i64) -> Result<usize, MnemaError> {
    if limit < 0 {
        return Err(MnemaError::InvalidInput(format!(
            "limit must be non-negative, got {limit}"
        )));
    }
    Ok(limit as usize)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn gif(width: u16, height: u16, tail: u8) -> Vec<u8> {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.push(tail);
        data
    }

    // ── memory round-trip ───────────────────────────────────────────────────

    #[test]
    fn remember_then_recall_round_trip() {
        let store = CognitiveStore::new();
        let entry = store
            .remember("the kettle whistles at dawn", "", 0.7, None, t0())
            .unwrap();

        let hits = store.recall("kettle", "", 0, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, entry.id);
        assert_eq!(hits[0].entry.layer, MemoryLayer::Working);
    }

    #[test]
    fn recall_ranking_fixture() {
        let store = CognitiveStore::new();
        store.remember("ranked low old", "", 0.5, None, t0()).unwrap();
        store
            .remember("ranked low new", "", 0.5, None, t0() + TimeDelta::seconds(1))
            .unwrap();
        store.remember("ranked high", "", 0.9, None, t0()).unwrap();

        let hits = store.recall("ranked", "", 0, 0.0).unwrap();
        let importances: Vec<f64> = hits.iter().map(|h| h.entry.importance).collect();
        assert_eq!(importances, vec![0.9, 0.5, 0.5]);
        assert_eq!(hits[1].entry.content, "ranked low new");
    }

    #[test]
    fn negative_limit_is_rejected() {
        let store = CognitiveStore::new();
        assert!(matches!(
            store.recall("x", "", -1, 0.0),
            Err(MnemaError::InvalidInput(_))
        ));
        assert!(matches!(
            store.visual_memories(-3, 0.0, false),
            Err(MnemaError::InvalidInput(_))
        ));
    }

    #[test]
    fn layer_names_parse_permissively() {
        let store = CognitiveStore::new();
        let entry = store
            .remember("a long term fact", "longterm", 0.5, None, t0())
            .unwrap();
        assert_eq!(entry.layer, MemoryLayer::LongTerm);

        let hits = store.recall("fact", "long_term", 0, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
    }

    // ── emotion ─────────────────────────────────────────────────────────────

    #[test]
    fn feel_parses_names_and_clamps() {
        let store = CognitiveStore::new();
        let (dominant, intensity) = store
            .feel(&[("joy".to_string(), 1.5)], "promotion", t0())
            .unwrap();
        assert_eq!(dominant, Emotion::Joy);
        assert!((intensity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn feel_rejects_unknown_emotion_without_side_effects() {
        let store = CognitiveStore::new();
        let err = store
            .feel(
                &[("joy".to_string(), 0.9), ("zeal".to_string(), 0.5)],
                "",
                t0(),
            )
            .unwrap_err();
        assert!(matches!(err, MnemaError::InvalidInput(_)));
        // The valid delta before the bad one was not applied either.
        let state = store.emotional_state(t0());
        assert_eq!(state.intensity, 0.0);
    }

    #[test]
    fn emotional_state_decays_between_reads() {
        let store = CognitiveStore::new();
        store.feel(&[("joy".to_string(), 2.0)], "", t0()).unwrap();
        let later = store.emotional_state(t0() + TimeDelta::seconds(30));
        assert!(later.intensity < 1.0);
        assert!(later.intensity > 0.0);
    }

    // ── graph ───────────────────────────────────────────────────────────────

    #[test]
    fn connect_missing_block_leaves_stats_unchanged() {
        let store = CognitiveStore::new();
        let a = store.add_block("anchor", "text");
        let before = store.graph_stats();

        let err = store.connect(a.0, a.0 + 999, 0.8).unwrap_err();
        assert!(matches!(err, MnemaError::NotFound(_)));
        let after = store.graph_stats();
        assert_eq!(before.connections, after.connections);
        assert_eq!(before.blocks, after.blocks);
    }

    #[test]
    fn graph_stats_read_is_idempotent() {
        let store = CognitiveStore::new();
        store.add_block("one", "text");
        store.add_block("two", "code");
        store.remember("an entry too", "", 0.5, None, t0()).unwrap();

        let first = store.graph_stats();
        let second = store.graph_stats();
        assert_eq!(first.blocks, second.blocks);
        assert_eq!(first.connections, second.connections);
        assert_eq!(first.blocks, 3);
    }

    // ── vision ──────────────────────────────────────────────────────────────

    #[test]
    fn see_bad_media_reports_structured_failure() {
        let store = CognitiveStore::new();
        let outcome = store.see(b"not an image", None, None, 0.5, false, t0());
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        assert!(outcome.id.is_none());

        let empty = store.see(&[], None, None, 0.5, false, t0());
        assert!(!empty.success);
    }

    #[test]
    fn see_with_store_creates_entry_and_image_block() {
        let store = CognitiveStore::new();
        let outcome = store.see(
            &gif(320, 200, 0),
            Some("sunset over the harbor".to_string()),
            None,
            0.8,
            true,
            t0(),
        );
        assert!(outcome.success);
        let entry_id = outcome.memory_entry.unwrap();

        let entry = store.memory(entry_id).unwrap();
        assert_eq!(entry.layer, MemoryLayer::LongTerm);
        assert_eq!(entry.content, "sunset over the harbor");

        // Entry block plus image block, linked together.
        let stats = store.graph_stats();
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.connections, 1);
    }

    #[test]
    fn see_links_image_to_context_relevant_memories() {
        let store = CognitiveStore::new();
        store
            .remember("harbor walk at sunset", "", 0.6, None, t0())
            .unwrap();
        let outcome = store.see(
            &gif(320, 200, 0),
            Some("photo from the pier".to_string()),
            Some("harbor".to_string()),
            0.8,
            true,
            t0(),
        );
        assert!(outcome.success);

        // prior entry block + new entry block + image block
        let stats = store.graph_stats();
        assert_eq!(stats.blocks, 3);
        // image↔entry plus image↔context hit
        assert_eq!(stats.connections, 2);
    }

    #[test]
    fn see_reports_failed_memory_link() {
        let store = CognitiveStore::with_config(StoreConfig {
            memory_capacity: 1,
            ..StoreConfig::default()
        });
        // The only slot belongs to the working layer, so the long-term
        // entry for the image has nothing to evict.
        store
            .remember("occupies the only slot", "", 0.9, None, t0())
            .unwrap();

        let outcome = store.see(&gif(10, 10, 0), None, None, 0.5, true, t0());
        assert!(outcome.success);
        assert!(outcome.memory_entry.is_none());
        assert!(outcome.error.is_some());
        // The visual record itself was still stored.
        assert_eq!(store.vision_status().stats.total_stored, 1);
    }

    #[test]
    fn duplicate_payload_is_consistent_across_calls() {
        let store = CognitiveStore::new();
        let data = gif(100, 100, 0);
        let first = store.see(&data, None, None, 0.5, true, t0());
        let second = store.see(&data, None, None, 0.9, true, t0());

        assert!(second.success);
        assert!(second.deduplicated);
        assert_eq!(second.id, first.id);
        assert_eq!(second.memory_entry, first.memory_entry);

        let status = store.vision_status();
        assert_eq!(status.stats.total_received, 2);
        assert_eq!(status.stats.total_stored, 1);
    }

    #[test]
    fn vision_status_reflects_graph_linkage() {
        let store = CognitiveStore::new();
        assert!(!store.vision_status().graph_connected);

        store.see(&gif(10, 10, 0), None, None, 0.5, false, t0());
        assert!(!store.vision_status().graph_connected);

        store.see(&gif(10, 10, 1), None, None, 0.5, true, t0());
        assert!(store.vision_status().graph_connected);
    }

    #[test]
    fn visual_memories_respect_recent_only() {
        let store = CognitiveStore::new();
        store.see(&gif(10, 10, 0), None, None, 0.9, false, t0());
        store.see(
            &gif(10, 10, 1),
            None,
            None,
            0.1,
            false,
            t0() + TimeDelta::seconds(5),
        );

        let ranked = store.visual_memories(0, 0.0, false).unwrap();
        assert_eq!(ranked[0].importance, 0.9);

        let recent = store.visual_memories(0, 0.0, true).unwrap();
        assert_eq!(recent[0].importance, 0.1);
    }

    #[test]
    fn mark_processed_round_trip() {
        let store = CognitiveStore::new();
        let outcome = store.see(&gif(10, 10, 0), None, None, 0.5, false, t0());
        let id = outcome.id.unwrap();

        assert!(store.mark_processed(id));
        assert_eq!(store.vision_status().stats.total_processed, 1);
        assert!(!store.mark_processed(Uuid::new_v4()));
    }

    // ── combined read-out ───────────────────────────────────────────────────

    #[test]
    fn cognitive_state_aggregates_all_engines() {
        let store = CognitiveStore::new();
        store.remember("a memory", "", 0.5, None, t0()).unwrap();
        store.feel(&[("hope".to_string(), 0.8)], "", t0()).unwrap();
        store.see(&gif(10, 10, 0), None, None, 0.5, false, t0());

        let state = store.cognitive_state(t0());
        assert_eq!(state.memories, 1);
        assert_eq!(state.graph.blocks, 1);
        assert_eq!(state.vision.total_received, 1);
        assert_eq!(state.emotion.dominant, Emotion::Hope);
    }
}
