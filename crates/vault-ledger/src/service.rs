use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vault_crypto::{signing_payload, IntegrityHasher, SignatureService};
use vault_store::EntryStore;
use vault_types::{Entry, HashStatus, SignatureStatus};

use crate::attachments::AttachmentStore;
use crate::cache::LedgerCache;
use crate::error::LedgerResult;
use crate::pipeline::{PipelineConfig, VerificationPipeline};
use crate::writer::{LedgerWriter, NewEntry};

/// The assembled integrity engine.
///
/// Explicitly constructed and dependency-injected: the store, the signer,
/// the attachment root, and (optionally) the cache are handed in — there is
/// no ambient global state anywhere in the engine.
///
/// Reads go through the cache. A miss triggers a single-flight refresh: the
/// gate below admits one physical pipeline run at a time, latecomers block
/// on it and then re-check validity instead of starting a second run. The
/// gate is not cancellable once entered — a refresh runs to completion or
/// failure so the cache is never left half-updated.
pub struct LedgerService {
    signer: Arc<SignatureService>,
    attachments: Arc<AttachmentStore>,
    cache: Arc<LedgerCache>,
    pipeline: VerificationPipeline,
    writer: LedgerWriter,
    refresh_gate: Mutex<()>,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn EntryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
    ) -> Self {
        Self::with_cache(store, signer, attachments, Arc::new(LedgerCache::new()))
    }

    /// Assemble with a caller-provided cache (custom TTL, shared instance).
    pub fn with_cache(
        store: Arc<dyn EntryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
        cache: Arc<LedgerCache>,
    ) -> Self {
        let pipeline = VerificationPipeline::with_config(
            Arc::clone(&store),
            Arc::clone(&signer),
            Arc::clone(&attachments),
            PipelineConfig::default(),
        );
        let writer = LedgerWriter::new(
            store,
            Arc::clone(&signer),
            Arc::clone(&attachments),
        );
        Self {
            signer,
            attachments,
            cache,
            pipeline,
            writer,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &LedgerCache {
        &self.cache
    }

    /// The verified, ordered history: refresh if stale, then read.
    pub async fn entries(&self, cancel: &CancellationToken) -> LedgerResult<Vec<Entry>> {
        self.refresh(cancel).await?;
        Ok(self.cache.get())
    }

    /// Single-flight cache refresh. Concurrent callers share one pipeline
    /// run; a valid cache short-circuits without touching the store.
    pub async fn refresh(&self, cancel: &CancellationToken) -> LedgerResult<()> {
        let _gate = self.refresh_gate.lock().await;
        if self.cache.is_valid() {
            debug!("cache still valid, refresh skipped");
            return Ok(());
        }

        self.cache.invalidate();
        let entries = self.pipeline.load_and_verify(cancel).await?;
        self.cache.set(entries);
        Ok(())
    }

    /// Append a new entry to the ledger. The cache is left alone — pair
    /// with [`Self::append_to_cache`] or a refresh as the caller sees fit.
    pub async fn create_entry(&self, input: NewEntry) -> LedgerResult<Entry> {
        self.writer.create_entry(input).await
    }

    /// Create the reversing entry for an earlier one: same counterparty and
    /// tags, negated amount, linked via the reversal reference.
    pub async fn create_reversal(
        &self,
        original: &Entry,
        description: String,
    ) -> LedgerResult<Entry> {
        self.create_entry(NewEntry {
            counterparty: original.counterparty().to_string(),
            description,
            amount: -original.amount(),
            tags: original.tags().to_vec(),
            attachment_path: None,
            reversal_of: Some(original.id()),
        })
        .await
    }

    /// Optimistic incremental cache update for a just-created entry.
    ///
    /// Deliberately distinct from the full reload: it checks only the new
    /// entry against the cached tail — the tail's verified status stands in
    /// for re-verifying the whole chain. On an invalid cache it falls back
    /// to a full refresh; the entry is already persisted, so nothing is
    /// appended by hand.
    pub async fn append_to_cache(
        &self,
        mut entry: Entry,
        cancel: &CancellationToken,
    ) -> LedgerResult<()> {
        if !self.cache.is_valid() {
            return self.refresh(cancel).await;
        }

        let own_ok = IntegrityHasher::verify_entry_hash(&entry)
            && self.attachments.verify(&entry).await;
        let chained = match self.cache.tail() {
            Some(tail) => {
                entry.previous_hash() == tail.hash() && tail.hash_status() == HashStatus::Valid
            }
            // Valid caches are non-empty; no tail means the cache expired
            // between the check above and now. The refresh will catch up.
            None => return self.refresh(cancel).await,
        };

        entry.set_hash_status(match (own_ok, chained) {
            (true, true) => HashStatus::Valid,
            (true, false) => HashStatus::BrokenChain,
            (false, _) => HashStatus::Invalid,
        });
        entry.set_signature_status(
            if self
                .signer
                .verify_base64(&signing_payload(&entry), entry.signature())
            {
                SignatureStatus::Valid
            } else {
                SignatureStatus::Invalid
            },
        );

        self.cache.append_if_valid(entry);
        Ok(())
    }

    /// Drop the cached history and force the next read to re-verify
    /// everything (e.g. after an account wipe).
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }
}
