use async_trait::async_trait;
use tokio::sync::mpsc;
use vault_types::Entry;

use crate::error::StoreResult;
use crate::row::EntryRow;

/// Receiver half of an entry stream. Each item is either a decoded entry or
/// the corruption error that killed the read.
pub type EntryStream = mpsc::Receiver<StoreResult<Entry>>;

/// The persistent-store collaborator.
///
/// All implementations must satisfy these invariants:
/// - `append_entry` is caller-sequential: no partial writes, and the
///   assigned ids are strictly monotonic.
/// - `stream_entries` may yield rows in any order; the verification
///   pipeline re-establishes chronological order itself.
/// - A row that cannot be decoded is surfaced as an error item, never
///   silently skipped.
/// - The store handles its own internal concurrency; per connection it is
///   treated as externally serializable.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Append a row and return the assigned id.
    async fn append_entry(&self, row: EntryRow) -> StoreResult<u64>;

    /// Stream every stored entry, in implementation-defined order.
    async fn stream_entries(&self) -> StoreResult<EntryStream>;

    /// The chain tip's hash, or an empty string for an empty ledger.
    async fn last_hash(&self) -> StoreResult<String>;

    /// The most recently appended entry, as the store persisted it.
    async fn last_entry(&self) -> StoreResult<Entry>;

    /// Latch an entry as reverted. Idempotent: marking an already-reverted
    /// entry is a no-op.
    async fn mark_reverted(&self, id: u64) -> StoreResult<()>;
}
