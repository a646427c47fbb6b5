//! Visual record storage, dedup, and ingestion statistics.
//!
//! ## Model
//!
//! Every successfully analyzed payload becomes a [`VisualRecord`] keyed
//! by UUID and fingerprinted by its SHA-256 hash. Ingesting a payload
//! whose hash matches an existing record returns the existing record's id
//! and stores nothing new; the receive counters still advance so the
//! statistics reflect traffic, not just retention.
//!
//! Raw payload bytes are retained separately from the records, in a
//! bounded most-recent window, so the record set can grow without holding
//! every image body in memory.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use mnema_graph::BlockId;
use mnema_types::{MnemaError, VisualAnalysis};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format;

/// Default number of raw payloads kept alongside the records.
pub const DEFAULT_PAYLOAD_RETENTION: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// One ingested visual memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualRecord {
    /// Unique identifier for this record.
    pub id: Uuid,
    /// Header analysis of the payload.
    pub analysis: VisualAnalysis,
    /// Caller-supplied description, when given.
    pub description: Option<String>,
    /// Caller-supplied context used for associative linking.
    pub context: Option<String>,
    /// Importance in `[0.0, 1.0]` (clamped on ingest).
    pub importance: f64,
    /// Set by [`VisionBuffer::mark_processed`].
    pub processed: bool,
    /// Wall-clock ingestion time (UTC).
    pub received_at: DateTime<Utc>,
    /// Graph block materialized for this record, when it was stored in
    /// memory.
    pub block: Option<BlockId>,
    /// Memory entry created for this record, when it was stored in
    /// memory.
    pub entry: Option<Uuid>,
}

/// Result of one ingest call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    /// Id of the record the payload landed on (existing on dedup).
    pub id: Uuid,
    /// Analysis of the payload.
    pub analysis: VisualAnalysis,
    /// `true` when the payload matched an existing record by hash.
    pub deduplicated: bool,
}

/// Aggregate ingestion counters.
///
/// Maintained incrementally on every receive; `total_stored` counts
/// records currently retained, the rest count traffic since construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionStats {
    /// Payloads received, including deduplicated ones.
    pub total_received: u64,
    /// Records marked processed so far.
    pub total_processed: u64,
    /// Records currently stored.
    pub total_stored: u64,
    /// Bytes received across all payloads.
    pub total_bytes: u64,
    /// Running mean megapixels over received payloads.
    pub avg_megapixels: f64,
    /// Receive count per format label.
    pub format_counts: HashMap<String, u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// VisionBuffer
// ─────────────────────────────────────────────────────────────────────────────

/// The visual memory buffer.
///
/// Analysis failures surface as [`MnemaError`]s; the cognitive façade
/// folds them into its structured outcome rather than failing transport.
#[derive(Debug)]
pub struct VisionBuffer {
    records: Vec<VisualRecord>,
    payloads: VecDeque<(Uuid, Vec<u8>)>,
    payload_retention: usize,
    stats: VisionStats,
}

impl Default for VisionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionBuffer {
    /// Create an empty buffer with the default payload retention window.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            payloads: VecDeque::new(),
            payload_retention: DEFAULT_PAYLOAD_RETENTION,
            stats: VisionStats::default(),
        }
    }

    /// Override the number of raw payloads retained (records are
    /// unaffected).
    pub fn with_payload_retention(mut self, retention: usize) -> Self {
        self.payload_retention = retention;
        self
    }

    /// Analyze and store one payload.
    ///
    /// On a hash match with an existing record the existing id is
    /// returned, no new record is created, and only the traffic counters
    /// advance. Analysis failures propagate as [`MnemaError`].
    pub fn ingest(
        &mut self,
        data: &[u8],
        description: Option<String>,
        context: Option<String>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<IngestReceipt, MnemaError> {
        let analysis = format::analyze(data)?;
        self.count_receive(&analysis);

        if let Some(existing) = self.records.iter().find(|r| r.analysis.hash == analysis.hash) {
            tracing::debug!(id = %existing.id, hash = %analysis.hash, "duplicate payload deduplicated");
            return Ok(IngestReceipt {
                id: existing.id,
                analysis,
                deduplicated: true,
            });
        }

        let record = VisualRecord {
            id: Uuid::new_v4(),
            analysis: analysis.clone(),
            description,
            context,
            importance: importance.clamp(0.0, 1.0),
            processed: false,
            received_at: now,
            block: None,
            entry: None,
        };
        let id = record.id;
        tracing::debug!(%id, format = %analysis.format, bytes = analysis.file_size, "visual memory stored");

        self.records.push(record);
        self.stats.total_stored = self.records.len() as u64;
        self.retain_payload(id, data);

        Ok(IngestReceipt {
            id,
            analysis,
            deduplicated: false,
        })
    }

    fn count_receive(&mut self, analysis: &VisualAnalysis) {
        self.stats.total_received += 1;
        self.stats.total_bytes += analysis.file_size;
        *self
            .stats
            .format_counts
            .entry(analysis.format.clone())
            .or_insert(0) += 1;
        let n = self.stats.total_received as f64;
        self.stats.avg_megapixels =
            (self.stats.avg_megapixels * (n - 1.0) + analysis.megapixels) / n;
    }

    fn retain_payload(&mut self, id: Uuid, data: &[u8]) {
        if self.payload_retention == 0 {
            return;
        }
        while self.payloads.len() >= self.payload_retention {
            self.payloads.pop_front();
        }
        self.payloads.push_back((id, data.to_vec()));
    }

    /// Attach the graph block materialized for a record.
    pub fn set_block(&mut self, id: Uuid, block: BlockId) -> Result<(), MnemaError> {
        self.record_mut(id)?.block = Some(block);
        Ok(())
    }

    /// Attach the memory entry created for a record.
    pub fn set_entry(&mut self, id: Uuid, entry: Uuid) -> Result<(), MnemaError> {
        self.record_mut(id)?.entry = Some(entry);
        Ok(())
    }

    /// Mark a record processed, feeding the `total_processed` counter.
    /// Re-marking is a no-op. Returns `false` for unknown ids.
    pub fn mark_processed(&mut self, id: Uuid) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) if !record.processed => {
                record.processed = true;
                self.stats.total_processed += 1;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Look up one record.
    pub fn record(&self, id: Uuid) -> Result<&VisualRecord, MnemaError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| MnemaError::NotFound(format!("visual memory {id}")))
    }

    fn record_mut(&mut self, id: Uuid) -> Result<&mut VisualRecord, MnemaError> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| MnemaError::NotFound(format!("visual memory {id}")))
    }

    /// Retained raw bytes for a record, when still inside the retention
    /// window.
    pub fn payload(&self, id: Uuid) -> Option<&[u8]> {
        self.payloads
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, data)| data.as_slice())
    }

    /// Ranked visual-memory query.
    ///
    /// Default order is importance (highest first) then recency;
    /// `recent_only` switches to pure recency. `limit = 0` means
    /// unlimited.
    pub fn visual_memories(
        &self,
        limit: usize,
        min_importance: f64,
        recent_only: bool,
    ) -> Vec<&VisualRecord> {
        let mut hits: Vec<&VisualRecord> = self
            .records
            .iter()
            .filter(|r| r.importance >= min_importance)
            .collect();
        if recent_only {
            hits.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        } else {
            hits.sort_by(|a, b| {
                b.importance
                    .total_cmp(&a.importance)
                    .then_with(|| b.received_at.cmp(&a.received_at))
            });
        }
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    /// Current counters.
    pub fn stats(&self) -> &VisionStats {
        &self.stats
    }

    /// Drop one record and its retained payload.
    pub fn remove(&mut self, id: Uuid) -> Result<VisualRecord, MnemaError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| MnemaError::NotFound(format!("visual memory {id}")))?;
        let record = self.records.remove(index);
        self.payloads.retain(|(pid, _)| *pid != id);
        self.stats.total_stored = self.records.len() as u64;
        Ok(record)
    }

    /// Drop all records and payloads; traffic counters are kept.
    pub fn clear(&mut self) {
        self.records.clear();
        self.payloads.clear();
        self.stats.total_stored = 0;
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
