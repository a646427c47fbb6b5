//! Lexical affect classification.
//!
//! A fixed keyword→emotion association table. [`process_text`] lowercases
//! the input, scores every emotion by the summed weights of its matching
//! keywords, and reports the strongest as the primary affect. The table is
//! compiled in; classification never makes an external call and is fully
//! deterministic, so the same text always yields the same deltas.
//!
//! The output is shaped as intensity deltas ready to be blended into an
//! [`EmotionEngine`](crate::engine::EmotionEngine) via
//! [`feel`](crate::engine::EmotionEngine::feel).

use mnema_types::Emotion;
use serde::{Deserialize, Serialize};

/// Keyword, target emotion, score contribution per match.
const LEXICON: &[(&str, Emotion, f64)] = &[
    ("happy", Emotion::Joy, 0.6),
    ("glad", Emotion::Joy, 0.5),
    ("wonderful", Emotion::Joy, 0.6),
    ("fantastic", Emotion::Joy, 0.7),
    ("celebrate", Emotion::Joy, 0.6),
    ("sad", Emotion::Sadness, 0.6),
    ("unhappy", Emotion::Sadness, 0.5),
    ("cry", Emotion::Sadness, 0.6),
    ("miss you", Emotion::Sadness, 0.5),
    ("lonely", Emotion::Sadness, 0.6),
    ("angry", Emotion::Anger, 0.7),
    ("furious", Emotion::Anger, 0.8),
    ("hate", Emotion::Anger, 0.7),
    ("afraid", Emotion::Fear, 0.6),
    ("scared", Emotion::Fear, 0.7),
    ("terrified", Emotion::Fear, 0.8),
    ("worried", Emotion::Fear, 0.5),
    ("anxious", Emotion::Fear, 0.5),
    ("surprised", Emotion::Surprise, 0.6),
    ("unexpected", Emotion::Surprise, 0.5),
    ("wow", Emotion::Surprise, 0.5),
    ("disgusting", Emotion::Disgust, 0.7),
    ("gross", Emotion::Disgust, 0.6),
    ("trust you", Emotion::Trust, 0.6),
    ("reliable", Emotion::Trust, 0.5),
    ("count on", Emotion::Trust, 0.5),
    ("looking forward", Emotion::Anticipation, 0.6),
    ("can't wait", Emotion::Anticipation, 0.7),
    ("soon", Emotion::Anticipation, 0.3),
    ("love", Emotion::Love, 0.7),
    ("adore", Emotion::Love, 0.7),
    ("dear", Emotion::Love, 0.4),
    ("optimistic", Emotion::Optimism, 0.6),
    ("bright side", Emotion::Optimism, 0.5),
    ("hope", Emotion::Hope, 0.6),
    ("hopefully", Emotion::Hope, 0.5),
    ("thank", Emotion::Gratitude, 0.7),
    ("grateful", Emotion::Gratitude, 0.7),
    ("appreciate", Emotion::Gratitude, 0.6),
    ("proud", Emotion::Pride, 0.7),
    ("accomplished", Emotion::Pride, 0.6),
    ("confident", Emotion::Confidence, 0.6),
    ("i can do", Emotion::Confidence, 0.5),
    ("relieved", Emotion::Relief, 0.7),
    ("finally over", Emotion::Relief, 0.6),
    ("phew", Emotion::Relief, 0.5),
    ("satisfied", Emotion::Satisfaction, 0.6),
    ("well done", Emotion::Satisfaction, 0.5),
    ("it works", Emotion::Satisfaction, 0.6),
    ("excited", Emotion::Excitement, 0.7),
    ("thrilled", Emotion::Excitement, 0.7),
    ("curious", Emotion::Curiosity, 0.6),
    ("wonder", Emotion::Curiosity, 0.5),
    ("what if", Emotion::Curiosity, 0.4),
    ("confused", Emotion::Confusion, 0.6),
    ("don't understand", Emotion::Confusion, 0.6),
    ("makes no sense", Emotion::Confusion, 0.5),
    ("frustrated", Emotion::Frustration, 0.7),
    ("annoying", Emotion::Frustration, 0.6),
    ("doesn't work", Emotion::Frustration, 0.6),
    ("stuck", Emotion::Frustration, 0.4),
    ("disappointed", Emotion::Disappointment, 0.7),
    ("let down", Emotion::Disappointment, 0.6),
];

/// Result of classifying one piece of text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextAffect {
    /// Non-zero per-emotion scores, clamped to `[0.0, 1.0]`, ordered by
    /// [`Emotion::ALL`].
    pub scores: Vec<(Emotion, f64)>,
    /// Strongest emotion, or `None` for neutral text.
    pub primary: Option<Emotion>,
    /// Score of the primary emotion (0.0 for neutral text).
    pub intensity: f64,
}

/// Score `text` against the built-in lexicon.
///
/// Matching is case-insensitive substring containment. Each keyword
/// contributes its weight once regardless of repetition; per-emotion
/// totals are clamped to 1.0. Ties for the primary emotion resolve in
/// [`Emotion::ALL`] declaration order.
pub fn process_text(text: &str) -> TextAffect {
    let haystack = text.to_lowercase();
    let mut totals = [0.0f64; 21];

    for &(keyword, emotion, weight) in LEXICON {
        if haystack.contains(keyword) {
            totals[emotion.index()] += weight;
        }
    }

    let scores: Vec<(Emotion, f64)> = Emotion::ALL
        .iter()
        .filter_map(|&e| {
            let total = totals[e.index()];
            (total > 0.0).then(|| (e, total.min(1.0)))
        })
        .collect();

    let mut primary = None;
    let mut intensity = 0.0;
    for &(emotion, score) in &scores {
        if score > intensity {
            primary = Some(emotion);
            intensity = score;
        }
    }

    TextAffect {
        scores,
        primary,
        intensity,
    }
}
