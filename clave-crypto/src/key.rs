//! License key generation and normalization.
//!
//! Keys are 20 random bytes, base32 encoded without padding and grouped
//! for display: `LIC-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX-XXXX`.
//!
//! Every digest, hash and comparison runs on [`normalize_key`] output, so
//! casing, dashes and stray whitespace in a presented key never matter.

use crate::error::{CryptoError, CryptoResult};
use data_encoding::BASE32_NOPAD;
use rand::RngCore;

/// Product-family tag prepended to every generated key.
pub const KEY_PREFIX: &str = "LIC";

/// Random bytes drawn per key (160 bits).
pub const KEY_ENTROPY_BYTES: usize = 20;

/// Characters per dash-separated display group.
pub const KEY_GROUP_SIZE: usize = 4;

/// Generates a new license key from the OS random source.
///
/// # Errors
///
/// Returns [`CryptoError::Entropy`] if the random source fails.
pub fn generate_license_key() -> CryptoResult<String> {
    let mut bytes = [0u8; KEY_ENTROPY_BYTES];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;

    let raw = BASE32_NOPAD.encode(&bytes);
    Ok(format_key(KEY_PREFIX, &raw, KEY_GROUP_SIZE))
}

/// Upper-cases `raw`, splits it into `group`-sized blocks and joins them
/// with dashes behind `prefix`.
#[must_use]
pub fn format_key(prefix: &str, raw: &str, group: usize) -> String {
    let chars: Vec<char> = raw.chars().map(|c| c.to_ascii_uppercase()).collect();
    let parts: Vec<String> = chars
        .chunks(group.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect();

    if parts.is_empty() {
        return prefix.to_string();
    }
    format!("{prefix}-{}", parts.join("-"))
}

/// Canonical form of a key: whitespace and dashes removed, ASCII upper-case.
///
/// Idempotent: `normalize_key(&normalize_key(k)) == normalize_key(k)`.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
