//! `mnema-memory` – The Memory Store.
//!
//! Layered, importance-scored memory entries with ranked recall. Every
//! entry is materialized as a content-graph block at creation time, so
//! recall can follow association edges to entries the query text alone
//! would not have surfaced.
//!
//! # Modules
//!
//! - [`store`] – [`MemoryStore`][store::MemoryStore]: entry storage,
//!   capacity enforcement with layer-local eviction, and the ranked
//!   direct-plus-associative recall query.

pub mod store;

pub use store::{MemoryEntry, MemoryStore, RecallHit};
