use serde::{Deserialize, Serialize};
use vault_types::format::{
    format_amount, format_timestamp, join_tags, parse_amount, parse_timestamp, split_tags,
};
use vault_types::Entry;

use crate::error::{StoreError, StoreResult};

/// The persisted shape of a ledger entry.
///
/// Exactly the fields a backend stores, in wire form: the amount and
/// timestamp as their canonical strings, tags joined by the canonical
/// separator. Decoding is strict — any unparseable field is data
/// corruption and fails the whole read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: u64,
    pub counterparty: String,
    pub description: String,
    pub amount: String,
    pub tags: String,
    pub attachment_name: String,
    pub attachment_hash: String,
    pub timestamp: String,
    pub hash: String,
    pub previous_hash: String,
    pub signature: String,
    pub reversal_of: Option<u64>,
    pub is_reverted: bool,
}

impl EntryRow {
    /// Encode an entry into its persisted shape.
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id(),
            counterparty: entry.counterparty().to_string(),
            description: entry.description().to_string(),
            amount: format_amount(entry.amount()),
            tags: join_tags(entry.tags()),
            attachment_name: entry.attachment_name().to_string(),
            attachment_hash: entry.attachment_hash().to_string(),
            timestamp: format_timestamp(entry.timestamp()),
            hash: entry.hash().to_string(),
            previous_hash: entry.previous_hash().to_string(),
            signature: entry.signature().to_string(),
            reversal_of: entry.reversal_of(),
            is_reverted: entry.is_reverted(),
        }
    }

    /// Decode the row back into an entry, failing with
    /// [`StoreError::Corrupt`] on any malformed field.
    pub fn decode(&self) -> StoreResult<Entry> {
        let amount = parse_amount(&self.amount).map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: e.to_string(),
        })?;
        let timestamp = parse_timestamp(&self.timestamp).map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: e.to_string(),
        })?;

        Ok(Entry::load(
            self.id,
            self.counterparty.clone(),
            self.description.clone(),
            amount,
            split_tags(&self.tags),
            self.attachment_name.clone(),
            self.attachment_hash.clone(),
            timestamp,
            self.previous_hash.clone(),
            self.hash.clone(),
            self.signature.clone(),
            self.is_reverted,
            self.reversal_of,
        ))
    }
}
