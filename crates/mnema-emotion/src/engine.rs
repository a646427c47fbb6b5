//! 21-dimension emotional state machine.
//!
//! ## Model
//!
//! Each [`Emotion`] holds an intensity in `[0.0, 1.0]`. Two rules move it:
//!
//! * **Blend** – [`EmotionEngine::feel`] updates each named emotion as a
//!   weighted combination of its previous value and the incoming one:
//!
//!   ```text
//!   new = clamp(old × r + incoming × (1 − r), 0, 1)
//!   ```
//!
//!   with retention `r ∈ [0, 1)`. Rapid repeated triggers therefore
//!   converge instead of oscillating. Emotions not named in the call are
//!   left to rule two.
//!
//! * **Passive decay** – every read or update first relaxes all
//!   intensities toward the neutral baseline `0.0`:
//!
//!   ```text
//!   intensity(t + Δt) = intensity(t) × d^Δt
//!   ```
//!
//!   with per-second factor `d ∈ (0, 1)`. Decay is computed lazily from
//!   the elapsed time between calls — there is no background timer — so
//!   state evolution is deterministic and replayable given a fixed clock.
//!
//! The dominant emotion is the highest intensity, ties broken by position
//! in [`Emotion::ALL`] (first declared wins).
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use mnema_emotion::EmotionEngine;
//! use mnema_types::Emotion;
//!
//! let mut engine = EmotionEngine::new();
//! let now = Utc::now();
//!
//! let (dominant, intensity) = engine.feel(&[(Emotion::Joy, 1.5)], "good news", now);
//! assert_eq!(dominant, Emotion::Joy);
//! assert!((intensity - 1.0).abs() < 1e-9); // clamped, never above 1.0
//! ```

use chrono::{DateTime, Utc};
use mnema_types::Emotion;
use serde::{Deserialize, Serialize};

use crate::lexicon;

/// Default retention `r` in the blend rule (weight of the old value).
pub const DEFAULT_RETENTION: f64 = 0.3;

/// Default per-second decay factor `d`.
pub const DEFAULT_DECAY_PER_SEC: f64 = 0.995;

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// A decayed, read-only view of the emotional state at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSnapshot {
    /// Intensity per emotion, in [`Emotion::ALL`] order.
    pub intensities: Vec<(Emotion, f64)>,
    /// Highest-intensity emotion (first-declared wins on ties).
    pub dominant: Emotion,
    /// Intensity of the dominant emotion.
    pub intensity: f64,
    /// The most recent trigger text, for observability only.
    pub last_trigger: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// EmotionEngine
// ─────────────────────────────────────────────────────────────────────────────

/// The emotional state machine.
///
/// Not internally synchronized; the cognitive façade serializes access.
#[derive(Debug, Clone)]
pub struct EmotionEngine {
    intensities: [f64; 21],
    retention: f64,
    decay_per_sec: f64,
    last_update: Option<DateTime<Utc>>,
    last_trigger: Option<String>,
}

impl Default for EmotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionEngine {
    /// Create an engine at the neutral baseline with default parameters.
    pub fn new() -> Self {
        Self {
            intensities: [0.0; 21],
            retention: DEFAULT_RETENTION,
            decay_per_sec: DEFAULT_DECAY_PER_SEC,
            last_update: None,
            last_trigger: None,
        }
    }

    /// Override the blend retention `r` (clamped to `[0.0, 0.99]`).
    pub fn with_retention(mut self, retention: f64) -> Self {
        self.retention = retention.clamp(0.0, 0.99);
        self
    }

    /// Override the per-second decay factor `d` (clamped to
    /// `[0.001, 0.9999]`, the same guard rails as elsewhere in the
    /// workspace's decay models).
    pub fn with_decay_per_sec(mut self, decay: f64) -> Self {
        self.decay_per_sec = decay.clamp(0.001, 0.9999);
        self
    }

    /// Blend the named intensity deltas into the state and return the
    /// resulting dominant emotion and its intensity.
    ///
    /// Decay for the elapsed time since the previous call is applied
    /// first, so unnamed emotions drift toward baseline while named ones
    /// are blended. Out-of-range incoming values are handled by the final
    /// clamp; they are never rejected.
    pub fn feel(
        &mut self,
        deltas: &[(Emotion, f64)],
        trigger: &str,
        now: DateTime<Utc>,
    ) -> (Emotion, f64) {
        self.apply_decay(now);

        for &(emotion, incoming) in deltas {
            let old = self.intensities[emotion.index()];
            let new = (old * self.retention + incoming * (1.0 - self.retention)).clamp(0.0, 1.0);
            self.intensities[emotion.index()] = new;
        }

        if !trigger.is_empty() {
            self.last_trigger = Some(trigger.to_string());
        }

        let (dominant, intensity) = self.dominant();
        tracing::debug!(%dominant, intensity, trigger, "emotion state updated");
        (dominant, intensity)
    }

    /// Run the lexical classifier over `text` and blend its scores in.
    ///
    /// Returns the classifier's verdict (which may be empty for neutral
    /// text, in which case only decay happens).
    pub fn feel_text(&mut self, text: &str, now: DateTime<Utc>) -> lexicon::TextAffect {
        let affect = lexicon::process_text(text);
        if affect.scores.is_empty() {
            self.apply_decay(now);
        } else {
            self.feel(&affect.scores, text, now);
        }
        affect
    }

    /// Decayed snapshot of the full state at `now`.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> EmotionSnapshot {
        self.apply_decay(now);
        let (dominant, intensity) = self.dominant();
        EmotionSnapshot {
            intensities: Emotion::ALL
                .iter()
                .map(|&e| (e, self.intensities[e.index()]))
                .collect(),
            dominant,
            intensity,
            last_trigger: self.last_trigger.clone(),
        }
    }

    /// The dominant emotion of the state as last decayed.
    ///
    /// Ties are broken by declaration order: the comparison is strict, so
    /// the first-declared emotion at the maximum intensity wins.
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = Emotion::ALL[0];
        let mut best_value = self.intensities[0];
        for &emotion in &Emotion::ALL[1..] {
            let value = self.intensities[emotion.index()];
            if value > best_value {
                best = emotion;
                best_value = value;
            }
        }
        (best, best_value)
    }

    /// Stored intensity of one emotion as last decayed.
    pub fn intensity_of(&self, emotion: Emotion) -> f64 {
        self.intensities[emotion.index()]
    }

    // ── Internal ────────────────────────────────────────────────────────────

    /// Relax every intensity toward baseline for the time elapsed since
    /// the previous decay point. Clock regressions are treated as zero
    /// elapsed time.
    fn apply_decay(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_update {
            let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
            if elapsed > 0.0 {
                let factor = self.decay_per_sec.powf(elapsed);
                for value in &mut self.intensities {
                    *value *= factor;
                }
            }
        }
        self.last_update = Some(now);
    }
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

    // ── blend ────────────────────────────────────────────────────────────────

    #[test]
    fn overdriven_intensity_clamps_to_one() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Joy, 1.5)], "overflow", t0());
        assert_eq!(engine.intensity_of(Emotion::Joy), 1.0);
    }

    #[test]
    fn negative_intensity_clamps_to_zero() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Fear, -2.0)], "", t0());
        assert_eq!(engine.intensity_of(Emotion::Fear), 0.0);
    }

    #[test]
    fn blend_weights_old_and_incoming() {
        let mut engine = EmotionEngine::new().with_retention(0.5);
        engine.feel(&[(Emotion::Trust, 0.8)], "", t0());
        // From baseline: 0 × 0.5 + 0.8 × 0.5 = 0.4
        assert!((engine.intensity_of(Emotion::Trust) - 0.4).abs() < 1e-9);

        engine.feel(&[(Emotion::Trust, 0.8)], "", t0());
        // 0.4 × 0.5 + 0.8 × 0.5 = 0.6 — converging toward 0.8, no overshoot.
        assert!((engine.intensity_of(Emotion::Trust) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn repeated_triggers_converge_not_oscillate() {
        let mut engine = EmotionEngine::new();
        let mut previous = 0.0;
        for _ in 0..20 {
            engine.feel(&[(Emotion::Curiosity, 0.9)], "", t0());
            let current = engine.intensity_of(Emotion::Curiosity);
            assert!(current >= previous);
            assert!(current <= 0.9 + 1e-9);
            previous = current;
        }
    }

    #[test]
    fn unnamed_emotions_keep_their_value_at_same_instant() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Joy, 1.0)], "", t0());
        let joy = engine.intensity_of(Emotion::Joy);
        engine.feel(&[(Emotion::Sadness, 0.5)], "", t0());
        // Zero elapsed time: joy untouched by the sadness update.
        assert_eq!(engine.intensity_of(Emotion::Joy), joy);
    }

    // ── dominant ─────────────────────────────────────────────────────────────

    #[test]
    fn dominant_returns_highest_intensity() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Fear, 0.3), (Emotion::Gratitude, 0.9)], "", t0());
        let (dominant, _) = engine.dominant();
        assert_eq!(dominant, Emotion::Gratitude);
    }

    #[test]
    fn dominant_tie_breaks_by_declaration_order() {
        let mut engine = EmotionEngine::new();
        // Both clamp to exactly 1.0; Joy is declared before Sadness.
        engine.feel(&[(Emotion::Sadness, 2.0), (Emotion::Joy, 2.0)], "", t0());
        let (dominant, intensity) = engine.dominant();
        assert_eq!(dominant, Emotion::Joy);
        assert_eq!(intensity, 1.0);
    }

    #[test]
    fn neutral_engine_dominant_is_first_declared_at_zero() {
        let mut engine = EmotionEngine::new();
        let snap = engine.snapshot(t0());
        assert_eq!(snap.dominant, Emotion::Joy);
        assert_eq!(snap.intensity, 0.0);
    }

    // ── decay ────────────────────────────────────────────────────────────────

    #[test]
    fn decay_is_deterministic_for_fixed_elapsed_time() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Joy, 2.0)], "", t0()); // joy = 1.0
        let later = t0() + TimeDelta::seconds(10);
        let snap = engine.snapshot(later);
        let expected = DEFAULT_DECAY_PER_SEC.powf(10.0);
        let joy = snap.intensities[Emotion::Joy.index()].1;
        assert!((joy - expected).abs() < 1e-9);
    }

    #[test]
    fn every_intensity_moves_strictly_toward_baseline() {
        let mut engine = EmotionEngine::new();
        engine.feel(
            &[(Emotion::Joy, 1.0), (Emotion::Fear, 0.5), (Emotion::Love, 0.2)],
            "",
            t0(),
        );
        let before: Vec<f64> = Emotion::ALL
            .iter()
            .map(|&e| engine.intensity_of(e))
            .collect();

        engine.snapshot(t0() + TimeDelta::seconds(60));

        for (&emotion, &old) in Emotion::ALL.iter().zip(&before) {
            let new = engine.intensity_of(emotion);
            if old > 0.0 {
                assert!(new < old, "{emotion} did not decay");
                assert!(new > 0.0, "{emotion} overshot the baseline");
            } else {
                assert_eq!(new, 0.0);
            }
        }
    }

    #[test]
    fn decay_compounds_across_successive_reads() {
        let mut engine = EmotionEngine::new().with_decay_per_sec(0.5);
        engine.feel(&[(Emotion::Joy, 2.0)], "", t0()); // joy = 1.0
        engine.snapshot(t0() + TimeDelta::seconds(1));
        engine.snapshot(t0() + TimeDelta::seconds(2));
        // 1.0 × 0.5 × 0.5 = 0.25
        assert!((engine.intensity_of(Emotion::Joy) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn clock_regression_applies_no_decay() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Joy, 2.0)], "", t0());
        engine.snapshot(t0() - TimeDelta::seconds(30));
        assert_eq!(engine.intensity_of(Emotion::Joy), 1.0);
    }

    // ── trigger / snapshot ───────────────────────────────────────────────────

    #[test]
    fn last_trigger_is_recorded() {
        let mut engine = EmotionEngine::new();
        engine.feel(&[(Emotion::Joy, 0.5)], "the tests passed", t0());
        let snap = engine.snapshot(t0());
        assert_eq!(snap.last_trigger.as_deref(), Some("the tests passed"));
    }

    #[test]
    fn snapshot_covers_all_21_emotions_in_order() {
        let mut engine = EmotionEngine::new();
        let snap = engine.snapshot(t0());
        assert_eq!(snap.intensities.len(), 21);
        assert_eq!(snap.intensities[0].0, Emotion::Joy);
        assert_eq!(snap.intensities[20].0, Emotion::Disappointment);
    }

    #[test]
    fn feel_text_blends_classifier_scores() {
        let mut engine = EmotionEngine::new();
        let affect = engine.feel_text("thank you, this is wonderful", t0());
        assert!(affect.primary.is_some());
        assert!(engine.intensity_of(Emotion::Gratitude) > 0.0);
    }

    #[test]
    fn parameter_builders_clamp() {
        let engine = EmotionEngine::new()
            .with_retention(1.5)
            .with_decay_per_sec(2.0);
        assert!(engine.retention <= 0.99);
        assert!(engine.decay_per_sec <= 0.9999);
    }
}
