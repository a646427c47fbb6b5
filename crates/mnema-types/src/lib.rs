//! `mnema-types` – shared vocabulary of the Mnema cognitive store.
//!
//! Every other crate in the workspace speaks these types: memory layers,
//! graph node kinds, the fixed 21-entry emotion set, the error taxonomy,
//! and the wire-visible [`VisualAnalysis`] record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Memory layers
// ─────────────────────────────────────────────────────────────────────────────

/// Advisory category of a memory entry, used for recall scoping and
/// eviction grouping.
///
/// Callers supply layers as free-form strings; unknown names are preserved
/// verbatim in [`MemoryLayer::Custom`] rather than rejected, and an empty
/// string means "caller omitted it" and maps to the [`MemoryLayer::Working`]
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryLayer {
    /// Active scratchpad for the current session.
    Working,
    /// Durable knowledge expected to survive across sessions.
    LongTerm,
    /// Affect-laden memories written alongside emotion updates.
    Emotional,
    /// Any caller-defined layer name, stored verbatim.
    Custom(String),
}

impl MemoryLayer {
    /// Parse a caller-supplied layer string.
    ///
    /// Empty input yields the default ([`MemoryLayer::Working`]); known
    /// names are matched case-insensitively with common aliases; anything
    /// else becomes [`MemoryLayer::Custom`].
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "" | "working" => Self::Working,
            "long_term" | "longterm" | "long" => Self::LongTerm,
            "emotional" | "emotion" => Self::Emotional,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Canonical string label for this layer.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Working => "working",
            Self::LongTerm => "long_term",
            Self::Emotional => "emotional",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Layers cross the wire as their string labels, so the serde forms go
// through `as_str`/`parse` rather than the derived variant encoding.
impl Serialize for MemoryLayer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemoryLayer {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph node kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Category tag of a content-graph block.
///
/// Same permissiveness rule as [`MemoryLayer`]: unknown kinds are kept
/// verbatim in [`NodeKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Block materialized from a memory entry.
    Memory,
    /// Free-standing text content.
    Text,
    /// Source-code content.
    Code,
    /// Block materialized from ingested media.
    Image,
    /// Any caller-defined kind, stored verbatim.
    Other(String),
}

impl NodeKind {
    /// Parse a caller-supplied kind string (empty ⇒ [`NodeKind::Text`]).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "" | "text" => Self::Text,
            "code" => Self::Code,
            "image" => Self::Image,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Canonical string label for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => "memory",
            Self::Text => "text",
            Self::Code => "code",
            Self::Image => "image",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Emotions
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed 21-entry emotion set.
///
/// Declaration order is a contract: dominant-emotion ties are broken by
/// position in [`Emotion::ALL`], first declared wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Trust,
    Anticipation,
    Love,
    Optimism,
    Hope,
    Gratitude,
    Pride,
    Confidence,
    Relief,
    Satisfaction,
    Excitement,
    Curiosity,
    Confusion,
    Frustration,
    Disappointment,
}

impl Emotion {
    /// All emotions in tie-break order.
    pub const ALL: [Emotion; 21] = [
        Self::Joy,
        Self::Sadness,
        Self::Anger,
        Self::Fear,
        Self::Surprise,
        Self::Disgust,
        Self::Trust,
        Self::Anticipation,
        Self::Love,
        Self::Optimism,
        Self::Hope,
        Self::Gratitude,
        Self::Pride,
        Self::Confidence,
        Self::Relief,
        Self::Satisfaction,
        Self::Excitement,
        Self::Curiosity,
        Self::Confusion,
        Self::Frustration,
        Self::Disappointment,
    ];

    /// Position of this emotion in [`Emotion::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Sadness => "sadness",
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Surprise => "surprise",
            Self::Disgust => "disgust",
            Self::Trust => "trust",
            Self::Anticipation => "anticipation",
            Self::Love => "love",
            Self::Optimism => "optimism",
            Self::Hope => "hope",
            Self::Gratitude => "gratitude",
            Self::Pride => "pride",
            Self::Confidence => "confidence",
            Self::Relief => "relief",
            Self::Satisfaction => "satisfaction",
            Self::Excitement => "excitement",
            Self::Curiosity => "curiosity",
            Self::Confusion => "confusion",
            Self::Frustration => "frustration",
            Self::Disappointment => "disappointment",
        }
    }

    /// Parse a wire name (case-insensitive). Returns `None` for names
    /// outside the fixed set.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL.iter().copied().find(|e| e.as_str() == lower)
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Emotions cross the wire by their lower-case names, same as layers and
// kinds. Unknown names are an error here since the set is closed.
impl Serialize for Emotion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown emotion {s:?}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visual analysis record
// ─────────────────────────────────────────────────────────────────────────────

/// The analysis record returned for every ingested image.
///
/// The field set is a wire contract: external callers depend on exactly
/// these fields being present, and `aspect_ratio`/`megapixels` being
/// consistent with `width`/`height` at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisualAnalysis {
    /// Detected container format label (e.g. `"png"`).
    pub format: String,
    /// Pixel width parsed from the header.
    pub width: u32,
    /// Pixel height parsed from the header.
    pub height: u32,
    /// Payload length in bytes.
    pub file_size: u64,
    /// Hex-encoded SHA-256 digest of the raw payload.
    pub hash: String,
    /// `width / height`.
    pub aspect_ratio: f64,
    /// `width * height / 1e6`.
    pub megapixels: f64,
}

impl VisualAnalysis {
    /// Build the record from header-derived facts, computing the derived
    /// fields so they can never drift from `width`/`height`.
    pub fn new(format: String, width: u32, height: u32, file_size: u64, hash: String) -> Self {
        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f64 / height as f64
        };
        Self {
            format,
            width,
            height,
            file_size,
            hash,
            aspect_ratio,
            megapixels: width as f64 * height as f64 / 1_000_000.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced across the cognitive-store boundary.
///
/// Reads never fail on "no results" — they return empty collections; only
/// malformed requests and missing-by-id lookups produce errors.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MnemaError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Empty input")]
    EmptyInput,

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
}
