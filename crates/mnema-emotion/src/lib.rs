//! `mnema-emotion` – The Emotion Engine.
//!
//! Maintains a 21-dimension vector of emotion intensities with blended
//! updates and deterministic, lazily computed wall-clock decay, and derives
//! a dominant mood with a fixed tie-break order.
//!
//! # Modules
//!
//! - [`engine`] – [`EmotionEngine`][engine::EmotionEngine]: the state
//!   machine proper. All time-dependent behavior takes an explicit `now`,
//!   so state evolution is replayable under a fixed clock.
//! - [`lexicon`] – [`process_text`][lexicon::process_text]: a fixed
//!   keyword→emotion association table turning free text into an intensity
//!   delta without any external calls.

pub mod engine;
pub mod lexicon;

pub use engine::{EmotionEngine, EmotionSnapshot};
pub use lexicon::{TextAffect, process_text};
