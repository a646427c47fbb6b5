//! `mnema-vision` – Vision Ingestion.
//!
//! Accepts raw image payloads, identifies them by header inspection alone
//! (no decoder dependency), fingerprints them with SHA-256 for
//! content-addressed deduplication, and keeps aggregate ingestion
//! statistics that stay consistent with the stored records.
//!
//! # Modules
//!
//! - [`format`] – [`ImageFormat`][format::ImageFormat] magic-byte
//!   detection, header dimension parsing, and the
//!   [`analyze`][format::analyze] entry point producing a
//!   [`VisualAnalysis`][mnema_types::VisualAnalysis].
//! - [`ingest`] – [`VisionBuffer`][ingest::VisionBuffer]: the record
//!   store with dedup-by-hash, bounded raw-payload retention, ranked
//!   visual-memory queries, and incremental statistics.

pub mod format;
pub mod ingest;

pub use format::{ImageFormat, analyze};
pub use ingest::{IngestReceipt, VisionBuffer, VisionStats, VisualRecord};
