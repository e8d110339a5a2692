use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use vault_crypto::{signing_payload, IntegrityHasher, SignatureService};
use vault_store::{EntryRow, EntryStore};
use vault_types::Entry;

use crate::attachments::AttachmentStore;
use crate::error::LedgerResult;

/// Input for a new ledger entry.
#[derive(Clone, Debug, Default)]
pub struct NewEntry {
    pub counterparty: String,
    pub description: String,
    pub amount: Decimal,
    pub tags: Vec<String>,
    /// Source path of a receipt to pull into managed storage, if any.
    pub attachment_path: Option<PathBuf>,
    /// Id of an earlier entry this one reverses, if any.
    pub reversal_of: Option<u64>,
}

/// The append path.
///
/// Binds a new entry to the current chain tip, hashes and signs it, hands it
/// to the store, and returns the row the store actually persisted — the
/// re-read guards against store-side defaulting diverging from the
/// in-memory object. The writer never touches the cache; callers decide
/// whether to invalidate or append.
pub struct LedgerWriter {
    store: Arc<dyn EntryStore>,
    signer: Arc<SignatureService>,
    attachments: Arc<AttachmentStore>,
}

impl LedgerWriter {
    pub fn new(
        store: Arc<dyn EntryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
    ) -> Self {
        Self {
            store,
            signer,
            attachments,
        }
    }

    /// Create, chain, sign, and persist a new entry.
    pub async fn create_entry(&self, input: NewEntry) -> LedgerResult<Entry> {
        let previous_hash = self.store.last_hash().await?;

        let (attachment_name, attachment_hash) = match &input.attachment_path {
            Some(path) => self.attachments.import(path).await?,
            None => (String::new(), String::new()),
        };

        let mut entry = Entry::create(
            input.counterparty,
            input.description,
            input.amount,
            input.tags,
            attachment_name,
            attachment_hash,
            previous_hash,
            input.reversal_of,
        );
        entry.set_hash(IntegrityHasher::hash_entry(&entry));
        entry.set_signature(self.signer.sign_base64(&signing_payload(&entry)));

        let id = self.store.append_entry(EntryRow::from_entry(&entry)).await?;
        debug!(id, "entry appended");

        // Authoritative copy: whatever the store persisted wins.
        let stored = self.store.last_entry().await?;

        if let Some(reversed_id) = stored.reversal_of() {
            self.store.mark_reverted(reversed_id).await?;
        }

        Ok(stored)
    }
}
