//! Persistent-store boundary for LedgerVault.
//!
//! The integrity engine never talks to a database directly. It exchanges
//! [`EntryRow`] values — the exact persisted field shape — through the
//! [`EntryStore`] trait, and [`InMemoryStore`] provides the reference
//! implementation for tests and embedding.

pub mod error;
pub mod memory;
pub mod row;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use row::EntryRow;
pub use traits::{EntryStore, EntryStream};
