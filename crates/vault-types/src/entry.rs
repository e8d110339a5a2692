use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::format::now_truncated;
use crate::status::{HashStatus, SignatureStatus};

/// One tamper-evident ledger record.
///
/// An entry is constructed unhashed and unsigned via [`Entry::create`],
/// given its hash and signature by the append path, persisted, and later
/// rebuilt from storage via [`Entry::load`]. The verification statuses are
/// transient: recomputed on every load, never persisted.
///
/// Mutation is deliberately narrow:
/// - `hash` and `signature` accept their first write only;
/// - `is_reverted` is a write-once latch — the first [`Entry::mark_reverted`]
///   wins and later calls are no-ops;
/// - the status fields are freely recomputable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    id: u64,
    counterparty: String,
    description: String,
    amount: Decimal,
    tags: Vec<String>,
    attachment_name: String,
    attachment_hash: String,
    timestamp: NaiveDateTime,
    hash: String,
    previous_hash: String,
    signature: String,
    reversal_of: Option<u64>,
    is_reverted: bool,
    #[serde(skip)]
    reverted_latched: bool,
    #[serde(skip)]
    hash_status: HashStatus,
    #[serde(skip)]
    signature_status: SignatureStatus,
}

impl Entry {
    /// Build a new, not-yet-persisted entry stamped with the current local
    /// time truncated to whole seconds. `id` is zero until the store assigns
    /// one; `hash` and `signature` start empty.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        counterparty: String,
        description: String,
        amount: Decimal,
        tags: Vec<String>,
        attachment_name: String,
        attachment_hash: String,
        previous_hash: String,
        reversal_of: Option<u64>,
    ) -> Self {
        Self {
            id: 0,
            counterparty,
            description,
            amount,
            tags,
            attachment_name,
            attachment_hash,
            timestamp: now_truncated(),
            hash: String::new(),
            previous_hash,
            signature: String::new(),
            reversal_of,
            is_reverted: false,
            reverted_latched: false,
            hash_status: HashStatus::InProgress,
            signature_status: SignatureStatus::InProgress,
        }
    }

    /// Rebuild a persisted entry from its stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn load(
        id: u64,
        counterparty: String,
        description: String,
        amount: Decimal,
        tags: Vec<String>,
        attachment_name: String,
        attachment_hash: String,
        timestamp: NaiveDateTime,
        previous_hash: String,
        hash: String,
        signature: String,
        is_reverted: bool,
        reversal_of: Option<u64>,
    ) -> Self {
        Self {
            id,
            counterparty,
            description,
            amount,
            tags,
            attachment_name,
            attachment_hash,
            timestamp,
            hash,
            previous_hash,
            signature,
            reversal_of,
            is_reverted,
            reverted_latched: is_reverted,
            hash_status: HashStatus::InProgress,
            signature_status: SignatureStatus::InProgress,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn counterparty(&self) -> &str {
        &self.counterparty
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn attachment_name(&self) -> &str {
        &self.attachment_name
    }

    pub fn attachment_hash(&self) -> &str {
        &self.attachment_hash
    }

    /// Whether this entry carries an attachment to verify.
    pub fn has_attachment(&self) -> bool {
        !self.attachment_name.is_empty() || !self.attachment_hash.is_empty()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn reversal_of(&self) -> Option<u64> {
        self.reversal_of
    }

    pub fn is_reverted(&self) -> bool {
        self.is_reverted
    }

    pub fn hash_status(&self) -> HashStatus {
        self.hash_status
    }

    pub fn signature_status(&self) -> SignatureStatus {
        self.signature_status
    }

    /// Set the content hash. First write wins; an already-hashed entry is
    /// left untouched.
    pub fn set_hash(&mut self, hash: String) {
        if self.hash.is_empty() {
            self.hash = hash;
        }
    }

    /// Attach the MAC in its base64 wire form. First write wins; a signed
    /// entry is never re-signed.
    pub fn set_signature(&mut self, signature: String) {
        if self.signature.is_empty() {
            self.signature = signature;
        }
    }

    /// Latch this entry as reverted. Returns `true` on the first transition;
    /// every later call is a no-op returning `false`.
    pub fn mark_reverted(&mut self) -> bool {
        if self.reverted_latched {
            return false;
        }
        self.reverted_latched = true;
        self.is_reverted = true;
        true
    }

    pub fn set_hash_status(&mut self, status: HashStatus) {
        self.hash_status = status;
    }

    pub fn set_signature_status(&mut self, status: SignatureStatus) {
        self.signature_status = status;
    }
}
