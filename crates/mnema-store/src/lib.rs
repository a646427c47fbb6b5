//! `mnema-store` – The Cognitive Façade.
//!
//! Composes the four engines (memory, graph, emotion, vision) behind one
//! constructible [`CognitiveStore`]. There are no globals: callers own
//! their store instance, and every operation is atomic with respect to
//! the others because all engine state sits behind a single coarse lock.
//!
//! # Modules
//!
//! - [`store`] – [`CognitiveStore`][store::CognitiveStore] and its
//!   wire-shaped operation surface, plus [`StoreConfig`][store::StoreConfig].

pub mod store;

pub use store::{CognitiveState, CognitiveStore, SeeOutcome, StoreConfig, VisionStatus};
