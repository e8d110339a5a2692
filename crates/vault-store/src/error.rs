/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An append was rejected (constraint violation, backend failure).
    /// The entry is not considered created.
    #[error("write failure: {0}")]
    WriteFailure(String),

    /// A stored row cannot be decoded into an entry. Fatal to the load
    /// attempt that hit it — corrupt rows are surfaced, never skipped.
    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: u64, reason: String },

    /// The ledger holds no entries.
    #[error("ledger is empty")]
    Empty,

    /// No entry with the given id exists.
    #[error("entry not found: {0}")]
    NotFound(u64),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
