//! Canonical byte encodings of a ledger entry.
//!
//! Two disjoint forms exist:
//!
//! - [`canonical_bytes`] — the hashing input. Includes `previous_hash`, so an
//!   entry's hash commits to its position in the chain.
//! - [`signing_payload`] — the MAC input. Excludes `previous_hash` (and the
//!   hash itself), so re-chaining an entry never requires re-signing it.
//!
//! Both are pure, order-sensitive concatenations with no field delimiters
//! beyond the tag separator. The contract is exact byte-for-byte
//! reproducibility against existing persisted hashes, not unambiguous
//! parsing — field order and formats must never change.

use vault_types::format::{format_amount, format_timestamp, join_tags};
use vault_types::Entry;

/// The hashing input: counterparty, description, amount, tags, attachment
/// name, attachment hash, previous hash, reversal reference, timestamp.
pub fn canonical_bytes(entry: &Entry) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(entry.counterparty());
    out.push_str(entry.description());
    out.push_str(&format_amount(entry.amount()));
    out.push_str(&join_tags(entry.tags()));
    out.push_str(entry.attachment_name());
    out.push_str(entry.attachment_hash());
    out.push_str(entry.previous_hash());
    if let Some(id) = entry.reversal_of() {
        out.push_str(&id.to_string());
    }
    out.push_str(&format_timestamp(entry.timestamp()));
    out.into_bytes()
}

/// The MAC input: counterparty, description, amount, timestamp, tags,
/// attachment name, attachment hash.
pub fn signing_payload(entry: &Entry) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(entry.counterparty());
    out.push_str(entry.description());
    out.push_str(&format_amount(entry.amount()));
    out.push_str(&format_timestamp(entry.timestamp()));
    out.push_str(&join_tags(entry.tags()));
    out.push_str(entry.attachment_name());
    out.push_str(entry.attachment_hash());
    out.into_bytes()
}
