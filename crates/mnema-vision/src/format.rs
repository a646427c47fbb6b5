//! Image format identification and header analysis.
//!
//! Formats are recognized by magic bytes and dimensions are read straight
//! from the container header, so analysis touches at most a few dozen
//! bytes and never decodes pixel data:
//!
//! | format | signature                  | dimensions                          |
//! |--------|----------------------------|-------------------------------------|
//! | PNG    | `89 50 4E 47`              | IHDR, big-endian u32 at bytes 16–24 |
//! | JPEG   | `FF D8 FF`                 | first SOF0–SOF3 segment, big-endian |
//! | GIF    | `47 49 46 38`              | logical screen, little-endian u16   |
//! | WebP   | `52 49 46 46` + `WEBP`     | not parsed                          |
//! | BMP    | `42 4D`                    | not parsed                          |
//!
//! Formats whose dimensions are not parsed are still detected and named,
//! but [`analyze`] refuses them: a record without real dimensions would
//! poison the aspect-ratio and megapixel statistics downstream.

use mnema_types::{MnemaError, VisualAnalysis};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ─────────────────────────────────────────────────────────────────────────────
// ImageFormat
// ─────────────────────────────────────────────────────────────────────────────

/// A recognized image container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Unknown,
}

impl ImageFormat {
    /// Identify the format of a payload from its leading magic bytes.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x89, 0x50, 0x4E, 0x47, ..] => Self::Png,
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [0x47, 0x49, 0x46, 0x38, ..] => Self::Gif,
            [0x52, 0x49, 0x46, 0x46, ..] if data.len() >= 12 && &data[8..12] == b"WEBP" => {
                Self::WebP
            }
            [0x42, 0x4D, ..] => Self::Bmp,
            _ => Self::Unknown,
        }
    }

    /// Lower-case wire label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Unknown => "unknown",
        }
    }

    /// IANA media type.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Unknown => "bin",
        }
    }

    /// Read `(width, height)` from the container header, when this
    /// format's header layout is supported.
    pub fn dimensions(self, data: &[u8]) -> Option<(u32, u32)> {
        match self {
            Self::Png => png_dimensions(data),
            Self::Jpeg => jpeg_dimensions(data),
            Self::Gif => gif_dimensions(data),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header dimension parsers
// ─────────────────────────────────────────────────────────────────────────────

/// PNG: IHDR is always the first chunk, so width and height sit at fixed
/// offsets 16 and 20 as big-endian u32.
fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

/// JPEG: walk the segment stream for the first SOF0–SOF3 marker, whose
/// payload carries height then width as big-endian u16.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2; // past the SOI marker
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        if (0xC0..=0xC3).contains(&marker) {
            if i + 9 <= data.len() {
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                return Some((width, height));
            }
            return None;
        }
        if i + 4 <= data.len() {
            let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + len;
        } else {
            break;
        }
    }
    None
}

/// GIF: logical screen descriptor, little-endian u16 at bytes 6 and 8.
fn gif_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 {
        return None;
    }
    let width = u16::from_le_bytes([data[6], data[7]]) as u32;
    let height = u16::from_le_bytes([data[8], data[9]]) as u32;
    Some((width, height))
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis
// ─────────────────────────────────────────────────────────────────────────────

/// Hex-encoded SHA-256 of a payload.
pub fn content_hash(data: &[u8]) -> String {
    use std::fmt::Write;
    let digest = Sha256::digest(data);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        // Writing to a String cannot fail.
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Analyze a raw payload into a [`VisualAnalysis`] record.
///
/// Fails with [`MnemaError::EmptyInput`] for an empty payload and
/// [`MnemaError::DecodeError`] when the header is unrecognized or the
/// parsed height is zero.
pub fn analyze(data: &[u8]) -> Result<VisualAnalysis, MnemaError> {
    if data.is_empty() {
        return Err(MnemaError::EmptyInput);
    }
    let format = ImageFormat::detect(data);
    if format == ImageFormat::Unknown {
        return Err(MnemaError::DecodeError(
            "unrecognized image header".to_string(),
        ));
    }
    let Some((width, height)) = format.dimensions(data) else {
        return Err(MnemaError::DecodeError(format!(
            "cannot read dimensions from {format} header"
        )));
    };
    if height == 0 {
        return Err(MnemaError::DecodeError(
            "image header reports zero height".to_string(),
        ));
    }
    Ok(VisualAnalysis::new(
        format.label().to_string(),
        width,
        height,
        data.len() as u64,
        content_hash(data),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
