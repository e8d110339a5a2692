use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vault_crypto::{signing_payload, IntegrityHasher, SignatureService};
use vault_store::{EntryStore, EntryStream};
use vault_types::{Entry, HashStatus, SignatureStatus};

use crate::attachments::AttachmentStore;
use crate::error::{LedgerError, LedgerResult};

/// Tuning for the verification fan-out.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Number of verification workers. Defaults to the host's available
    /// parallelism.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Concurrent re-verification of the whole stored history.
///
/// Two phases:
/// 1. The store's stream is fanned out to a fixed worker pool. Each worker
///    independently recomputes the entry hash, the attachment content hash,
///    and the MAC — checks that need no ordering between entries.
/// 2. After the join barrier, entries are sorted ascending by id and one
///    sequential pass propagates chain breaks: an entry whose predecessor
///    failed verification, or whose `previous_hash` does not match the
///    predecessor's hash, is marked [`HashStatus::BrokenChain`]. That pass
///    depends on a single total order and must never run concurrently.
///
/// A cancelled run, and a run that hits a corrupt row, yields no results at
/// all — callers never observe a partially verified history.
pub struct VerificationPipeline {
    store: Arc<dyn EntryStore>,
    signer: Arc<SignatureService>,
    attachments: Arc<AttachmentStore>,
    config: PipelineConfig,
}

impl VerificationPipeline {
    pub fn new(
        store: Arc<dyn EntryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
    ) -> Self {
        Self::with_config(store, signer, attachments, PipelineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn EntryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            signer,
            attachments,
            config,
        }
    }

    /// Stream, verify, order, and chain-check every stored entry.
    pub async fn load_and_verify(&self, cancel: &CancellationToken) -> LedgerResult<Vec<Entry>> {
        if cancel.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }

        let stream = Arc::new(Mutex::new(self.store.stream_entries().await?));
        // Child token: lets one worker's failure stop the siblings without
        // cancelling the caller's token.
        let local = cancel.child_token();

        let worker_count = self.config.workers.max(1);
        debug!(workers = worker_count, "starting verification fan-out");

        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            workers.spawn(Self::worker(
                Arc::clone(&stream),
                Arc::clone(&self.signer),
                Arc::clone(&self.attachments),
                local.clone(),
            ));
        }

        let mut entries = Vec::new();
        let mut failure: Option<LedgerError> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => Err(LedgerError::Worker(join_err.to_string())),
            };
            match outcome {
                Ok(mut batch) => entries.append(&mut batch),
                Err(err) => {
                    local.cancel();
                    failure = Some(Self::prefer_failure(failure.take(), err));
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }
        if let Some(err) = failure {
            return Err(err);
        }

        // The chain pass depends on one total chronological order; the sort
        // must happen after every worker has finished.
        entries.sort_by_key(|entry| entry.id());
        Self::propagate_chain_breaks(&mut entries);

        info!(count = entries.len(), "ledger verification complete");
        Ok(entries)
    }

    /// Drain the shared stream, verifying entries in arrival order.
    async fn worker(
        stream: Arc<Mutex<EntryStream>>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
        cancel: CancellationToken,
    ) -> LedgerResult<Vec<Entry>> {
        let mut verified = Vec::new();
        loop {
            let next = {
                let mut stream = stream.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
                    item = stream.recv() => item,
                }
            };
            match next {
                None => return Ok(verified),
                Some(Err(err)) => return Err(err.into()),
                Some(Ok(mut entry)) => {
                    Self::verify_entry(&signer, &attachments, &mut entry).await;
                    verified.push(entry);
                }
            }
        }
    }

    /// The order-independent checks: entry hash, attachment hash, MAC.
    async fn verify_entry(
        signer: &SignatureService,
        attachments: &AttachmentStore,
        entry: &mut Entry,
    ) {
        entry.set_hash_status(HashStatus::Invalid);
        entry.set_signature_status(SignatureStatus::Invalid);

        if IntegrityHasher::verify_entry_hash(entry) && attachments.verify(entry).await {
            entry.set_hash_status(HashStatus::Valid);
        }
        if signer.verify_base64(&signing_payload(entry), entry.signature()) {
            entry.set_signature_status(SignatureStatus::Valid);
        }
    }

    /// Sequential pass over the id-sorted list. A break at entry `i` poisons
    /// every later entry: the predecessor's status feeds the next check, so
    /// `BrokenChain` is terminal once set.
    fn propagate_chain_breaks(entries: &mut [Entry]) {
        // A chain with fewer than two entries cannot be broken.
        if entries.len() < 2 {
            return;
        }
        for i in 1..entries.len() {
            let linked = entries[i - 1].hash_status() == HashStatus::Valid
                && entries[i].previous_hash() == entries[i - 1].hash();
            if !linked {
                warn!(id = entries[i].id(), "chain break");
                entries[i].set_hash_status(HashStatus::BrokenChain);
            }
        }
    }

    /// Keep the most informative failure: a structural error wins over a
    /// `Cancelled` that it caused.
    fn prefer_failure(current: Option<LedgerError>, new: LedgerError) -> LedgerError {
        match current {
            None => new,
            Some(LedgerError::Cancelled) if !matches!(new, LedgerError::Cancelled) => new,
            Some(current) => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use vault_crypto::MemoryKeyVault;
    use vault_store::{EntryRow, InMemoryStore, StoreError};

    use super::*;

    struct Fixture {
        store: Arc<InMemoryStore>,
        signer: Arc<SignatureService>,
        attachments: Arc<AttachmentStore>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                store: Arc::new(InMemoryStore::new()),
                signer: Arc::new(SignatureService::open(&MemoryKeyVault::new()).unwrap()),
                attachments: Arc::new(AttachmentStore::new(dir.path())),
                _dir: dir,
            }
        }

        async fn append(&self, counterparty: &str, amount: Decimal) -> u64 {
            let previous_hash = self.store.last_hash().await.unwrap();
            let mut entry = Entry::create(
                counterparty.to_string(),
                "test entry".to_string(),
                amount,
                vec!["test".to_string()],
                String::new(),
                String::new(),
                previous_hash,
                None,
            );
            entry.set_hash(IntegrityHasher::hash_entry(&entry));
            entry.set_signature(self.signer.sign_base64(&signing_payload(&entry)));
            self.store
                .append_entry(EntryRow::from_entry(&entry))
                .await
                .unwrap()
        }

        fn pipeline(&self) -> VerificationPipeline {
            VerificationPipeline::new(
                Arc::clone(&self.store) as Arc<dyn EntryStore>,
                Arc::clone(&self.signer),
                Arc::clone(&self.attachments),
            )
        }
    }

    #[tokio::test]
    async fn empty_ledger_verifies_to_empty_list() {
        let fx = Fixture::new();
        let entries = fx
            .pipeline()
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn fresh_chain_is_fully_valid_and_sorted() {
        let fx = Fixture::new();
        for i in 0..5 {
            fx.append(&format!("cp-{i}"), dec!(10)).await;
        }

        let entries = fx
            .pipeline()
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<u64> = entries.iter().map(Entry::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        for entry in &entries {
            assert_eq!(entry.hash_status(), HashStatus::Valid);
            assert_eq!(entry.signature_status(), SignatureStatus::Valid);
        }
    }

    #[tokio::test]
    async fn genesis_entry_is_chain_intact_by_definition() {
        let fx = Fixture::new();
        fx.append("solo", dec!(1)).await;

        let entries = fx
            .pipeline()
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].previous_hash(), "");
        assert_eq!(entries[0].hash_status(), HashStatus::Valid);
    }

    #[tokio::test]
    async fn tampered_entry_poisons_every_later_entry() {
        let fx = Fixture::new();
        for i in 0..4 {
            fx.append(&format!("cp-{i}"), dec!(25)).await;
        }
        // Flip entry 2's amount in storage without re-hashing or re-signing.
        fx.store
            .mutate_row(2, |row| row.amount = "-25".to_string())
            .unwrap();

        let entries = fx
            .pipeline()
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();

        let statuses: Vec<HashStatus> = entries.iter().map(Entry::hash_status).collect();
        assert_eq!(
            statuses,
            vec![
                HashStatus::Valid,
                HashStatus::Invalid,
                HashStatus::BrokenChain,
                HashStatus::BrokenChain,
            ]
        );
        // The tampered payload also breaks the MAC.
        assert_eq!(entries[1].signature_status(), SignatureStatus::Invalid);
        // Later entries were not themselves touched.
        assert_eq!(entries[2].signature_status(), SignatureStatus::Valid);
    }

    #[tokio::test]
    async fn rechained_entry_keeps_valid_signature() {
        let fx = Fixture::new();
        fx.append("a", dec!(1)).await;
        fx.append("b", dec!(2)).await;
        // Re-point entry 2 at a different predecessor hash. Its own hash no
        // longer matches and the chain is broken, but the signature — which
        // does not cover previous_hash — still verifies.
        fx.store
            .mutate_row(2, |row| row.previous_hash = "FFFF".to_string())
            .unwrap();

        let entries = fx
            .pipeline()
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entries[1].hash_status(), HashStatus::BrokenChain);
        assert_eq!(entries[1].signature_status(), SignatureStatus::Valid);
    }

    #[tokio::test]
    async fn foreign_signature_is_invalid_but_hash_stands() {
        let fx = Fixture::new();
        fx.append("a", dec!(1)).await;
        let foreign = SignatureService::open(&MemoryKeyVault::with_key(vec![3u8; 32])).unwrap();

        let entries = {
            // Same store, different key: signatures no longer verify.
            let pipeline = VerificationPipeline::new(
                Arc::clone(&fx.store) as Arc<dyn EntryStore>,
                Arc::new(foreign),
                Arc::clone(&fx.attachments),
            );
            pipeline
                .load_and_verify(&CancellationToken::new())
                .await
                .unwrap()
        };
        assert_eq!(entries[0].hash_status(), HashStatus::Valid);
        assert_eq!(entries[0].signature_status(), SignatureStatus::Invalid);
    }

    #[tokio::test]
    async fn cancelled_run_yields_no_results() {
        let fx = Fixture::new();
        fx.append("a", dec!(1)).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fx.pipeline().load_and_verify(&cancel).await.unwrap_err();
        assert!(matches!(err, LedgerError::Cancelled));
    }

    #[tokio::test]
    async fn corrupt_row_aborts_the_load() {
        let fx = Fixture::new();
        fx.append("a", dec!(1)).await;
        fx.append("b", dec!(2)).await;
        fx.store
            .mutate_row(1, |row| row.timestamp = "not a time".to_string())
            .unwrap();

        let err = fx.pipeline().load_and_verify(&CancellationToken::new()).await;
        assert!(matches!(
            err,
            Err(LedgerError::Store(StoreError::Corrupt { id: 1, .. }))
        ));
    }

    #[tokio::test]
    async fn single_worker_config_still_verifies_everything() {
        let fx = Fixture::new();
        for i in 0..3 {
            fx.append(&format!("cp-{i}"), dec!(5)).await;
        }
        let pipeline = VerificationPipeline::with_config(
            Arc::clone(&fx.store) as Arc<dyn EntryStore>,
            Arc::clone(&fx.signer),
            Arc::clone(&fx.attachments),
            PipelineConfig { workers: 1 },
        );
        let entries = pipeline
            .load_and_verify(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.hash_status() == HashStatus::Valid));
    }
}
