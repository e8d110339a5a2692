use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use vault_types::Entry;

use crate::error::{StoreError, StoreResult};
use crate::row::EntryRow;
use crate::traits::{EntryStore, EntryStream};

/// Buffer size of the streaming channel.
const STREAM_BUFFER: usize = 64;

/// In-memory store for tests, local demos, and embedding.
///
/// Rows live in an id-ordered vector behind one `RwLock`; streaming clones
/// the rows under the read lock and decodes them on a background task,
/// newest-first — the same order a SQL backend would produce with
/// `ORDER BY id DESC`.
#[derive(Default)]
pub struct InMemoryStore {
    rows: RwLock<Vec<EntryRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test support: mutate a stored row in place, bypassing all integrity
    /// bookkeeping. This is how tamper scenarios are simulated.
    pub fn mutate_row<F>(&self, id: u64, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut EntryRow),
    {
        let mut rows = self.write()?;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound(id))?;
        mutate(row);
        Ok(())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Vec<EntryRow>>> {
        self.rows
            .read()
            .map_err(|_| StoreError::WriteFailure("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Vec<EntryRow>>> {
        self.rows
            .write()
            .map_err(|_| StoreError::WriteFailure("store lock poisoned".into()))
    }
}

#[async_trait]
impl EntryStore for InMemoryStore {
    async fn append_entry(&self, mut row: EntryRow) -> StoreResult<u64> {
        let mut rows = self.write()?;

        if row.hash.is_empty() {
            return Err(StoreError::WriteFailure("entry has no hash".into()));
        }
        if rows.iter().any(|existing| existing.hash == row.hash) {
            return Err(StoreError::WriteFailure(format!(
                "duplicate entry hash {}",
                row.hash
            )));
        }

        let id = rows.last().map(|last| last.id).unwrap_or(0) + 1;
        row.id = id;
        rows.push(row);
        debug!(id, "appended entry row");
        Ok(id)
    }

    async fn stream_entries(&self) -> StoreResult<EntryStream> {
        let mut snapshot = self.read()?.clone();
        snapshot.reverse(); // newest-first, like the SQL reference query

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            for row in snapshot {
                if tx.send(row.decode()).await.is_err() {
                    // Receiver dropped: the consumer cancelled or failed.
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn last_hash(&self) -> StoreResult<String> {
        let rows = self.read()?;
        Ok(rows.last().map(|row| row.hash.clone()).unwrap_or_default())
    }

    async fn last_entry(&self) -> StoreResult<Entry> {
        let rows = self.read()?;
        rows.last().ok_or(StoreError::Empty)?.decode()
    }

    async fn mark_reverted(&self, id: u64) -> StoreResult<()> {
        let mut rows = self.write()?;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound(id))?;
        row.is_reverted = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use vault_crypto::IntegrityHasher;

    use super::*;

    fn row(counterparty: &str, previous_hash: &str) -> EntryRow {
        let mut entry = Entry::create(
            counterparty.to_string(),
            "desc".to_string(),
            dec!(10),
            vec![],
            String::new(),
            String::new(),
            previous_hash.to_string(),
            None,
        );
        entry.set_hash(IntegrityHasher::hash_entry(&entry));
        EntryRow::from_entry(&entry)
    }

    #[tokio::test]
    async fn append_assigns_monotonic_ids() {
        let store = InMemoryStore::new();
        let first = store.append_entry(row("a", "")).await.unwrap();
        let tip = store.last_hash().await.unwrap();
        let second = store.append_entry(row("b", &tip)).await.unwrap();
        assert_eq!((first, second), (1, 2));
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn append_rejects_duplicate_hash() {
        let store = InMemoryStore::new();
        let duplicate = row("a", "");
        store.append_entry(duplicate.clone()).await.unwrap();
        let err = store.append_entry(duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteFailure(_)));
    }

    #[tokio::test]
    async fn append_rejects_unhashed_row() {
        let store = InMemoryStore::new();
        let mut bad = row("a", "");
        bad.hash = String::new();
        assert!(matches!(
            store.append_entry(bad).await,
            Err(StoreError::WriteFailure(_))
        ));
    }

    #[tokio::test]
    async fn last_hash_is_empty_for_empty_ledger() {
        let store = InMemoryStore::new();
        assert_eq!(store.last_hash().await.unwrap(), "");
    }

    #[tokio::test]
    async fn last_entry_fails_on_empty_ledger() {
        let store = InMemoryStore::new();
        assert!(matches!(store.last_entry().await, Err(StoreError::Empty)));
    }

    #[tokio::test]
    async fn stream_yields_newest_first() {
        let store = InMemoryStore::new();
        store.append_entry(row("first", "")).await.unwrap();
        let tip = store.last_hash().await.unwrap();
        store.append_entry(row("second", &tip)).await.unwrap();

        let mut stream = store.stream_entries().await.unwrap();
        let mut seen = Vec::new();
        while let Some(item) = stream.recv().await {
            seen.push(item.unwrap().id());
        }
        assert_eq!(seen, vec![2, 1]);
    }

    #[tokio::test]
    async fn stream_surfaces_corrupt_rows() {
        let store = InMemoryStore::new();
        let id = store.append_entry(row("a", "")).await.unwrap();
        store
            .mutate_row(id, |row| row.amount = "garbage".to_string())
            .unwrap();

        let mut stream = store.stream_entries().await.unwrap();
        let item = stream.recv().await.unwrap();
        assert!(matches!(item, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn mark_reverted_is_idempotent() {
        let store = InMemoryStore::new();
        let id = store.append_entry(row("a", "")).await.unwrap();
        store.mark_reverted(id).await.unwrap();
        store.mark_reverted(id).await.unwrap();
        assert!(store.last_entry().await.unwrap().is_reverted());
    }

    #[tokio::test]
    async fn mark_reverted_unknown_id_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.mark_reverted(99).await,
            Err(StoreError::NotFound(99))
        ));
    }
}
