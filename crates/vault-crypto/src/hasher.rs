use sha2::{Digest, Sha256};
use vault_types::Entry;

use crate::canonical::canonical_bytes;

/// SHA-256 content hashing and chain-link verification.
///
/// Digests are encoded as uppercase hex with no separators — the format
/// every persisted `hash`, `previous_hash`, and `attachment_hash` carries.
/// Verification is always a boolean result, never an error: the caller
/// decides what a `false` means (invalid entry vs. broken chain).
pub struct IntegrityHasher;

impl IntegrityHasher {
    /// Hash raw bytes to uppercase hex.
    pub fn hash_bytes(data: &[u8]) -> String {
        hex::encode_upper(Sha256::digest(data))
    }

    /// Hash a string's UTF-8 bytes.
    pub fn hash_str(input: &str) -> String {
        Self::hash_bytes(input.as_bytes())
    }

    /// Hash an entry's canonical form.
    pub fn hash_entry(entry: &Entry) -> String {
        Self::hash_bytes(&canonical_bytes(entry))
    }

    /// Recompute an entry's hash and compare to the stored one.
    pub fn verify_entry_hash(entry: &Entry) -> bool {
        Self::hash_entry(entry) == entry.hash()
    }

    /// True iff `later` links to `earlier` and `earlier`'s own hash is
    /// itself valid.
    pub fn verify_chain_link(earlier: &Entry, later: &Entry) -> bool {
        later.previous_hash() == earlier.hash() && Self::verify_entry_hash(earlier)
    }
}
