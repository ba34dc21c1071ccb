//! Store key derivation
//!
//! Prompts can be arbitrarily long and contain any characters, so keys are
//! built from SHA-256 digests of the prompt and the fingerprint rather than
//! the raw text. The two digests are kept separate, so no concatenation of
//! prompt and fingerprint can collide with another pair.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `text`
pub fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Key for a prompt/fingerprint pair inside the namespace `prefix`
pub fn entry_key(prefix: &str, prompt: &str, fingerprint: &str) -> String {
    format!("{}:{}:{}", prefix, hash_text(prompt), hash_text(fingerprint))
}
