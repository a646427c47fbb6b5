//! `mnema-graph` – The Content Graph.
//!
//! An in-memory arena of typed content blocks joined by weighted
//! association edges. Memory entries and ingested media are materialized
//! here as blocks so that recall can traverse associations instead of only
//! matching text.
//!
//! # Modules
//!
//! - [`graph`] – [`ContentGraph`][graph::ContentGraph]: arena of
//!   [`Block`][graph::Block]s indexed by monotonically assigned
//!   [`BlockId`][graph::BlockId]s, with multigraph edges, cascade delete,
//!   and one-hop weighted neighborhood queries.

pub mod graph;

pub use graph::{Block, BlockId, ContentGraph, Edge, GraphStats};
