//! Shareable state tokens.
//!
//! A token is the two input texts serialized as a small JSON record, gzip-compressed at maximum
//! ratio, then encoded with the URL-safe base64 alphabet (`+` -> `-`, `/` -> `_`, no `=` padding):
//!
//! ```text
//! {"templateString": "...", "variablesString": "..."}  --gzip(9)-->  bytes  --base64url-->  token
//! ```
//!
//! Decoding reverses each step. It also accepts standard-alphabet or padded input, and a zlib
//! stream in place of gzip, so tokens produced by other inflate/deflate front-ends still load.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A snapshot of the two input surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableState {
    /// Template text.
    #[serde(rename = "templateString")]
    pub template_text: String,
    /// Variable-definition text.
    #[serde(rename = "variablesString")]
    pub variables_text: String,
}

impl ShareableState {
    /// Create a snapshot from the two input texts.
    pub fn new(template_text: impl Into<String>, variables_text: impl Into<String>) -> Self {
        Self {
            template_text: template_text.into(),
            variables_text: variables_text.into(),
        }
    }
}

/// A token could not be turned back into a [`ShareableState`].
///
/// Every failure (bad base64, corrupt stream, malformed record, missing fields) is this one type.
/// The reason is for logs only.
#[derive(Debug, Error)]
#[error("invalid shareable token: {reason}")]
pub struct DecodeFailure {
    reason: String,
}

impl DecodeFailure {
    fn new(reason: impl fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }

    /// Why decoding failed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Encode `state` into a URL-fragment-safe token.
pub fn encode(state: &ShareableState) -> io::Result<String> {
    let record = serde_json::to_vec(state).map_err(io::Error::other)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&record)?;
    let compressed = encoder.finish()?;

    Ok(TOKEN_ENGINE.encode(compressed))
}

/// Decode a token produced by [`encode`].
pub fn decode(token: &str) -> Result<ShareableState, DecodeFailure> {
    let normalized: String = token
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let compressed = TOKEN_ENGINE
        .decode(normalized.as_bytes())
        .map_err(DecodeFailure::new)?;
    let record = inflate(&compressed).map_err(DecodeFailure::new)?;
    serde_json::from_slice(&record).map_err(DecodeFailure::new)
}

fn inflate(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    if bytes.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(bytes).read_to_end(&mut out)?;
    } else {
        ZlibDecoder::new(bytes).read_to_end(&mut out)?;
    }
    Ok(out)
}
