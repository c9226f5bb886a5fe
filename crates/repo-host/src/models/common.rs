//! Common response types.

use base64::Engine as _;
use serde::Deserialize;

/// A reference to the commit a write produced.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    /// The new commit SHA.
    pub sha: String,
    /// The commit's API URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Decode GitHub's base64 payloads, which are wrapped at 60 columns with `\n`.
///
/// # Errors
///
/// Returns the underlying decode error if the payload is not valid base64.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}
