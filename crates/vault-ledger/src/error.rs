use vault_crypto::CryptoError;
use vault_store::StoreError;

/// Errors from the integrity engine.
///
/// Only structural problems live here: a corrupt row, a failed write, an
/// unavailable key, a cancelled run. Integrity, signature, and chain
/// failures are data — they ride on the entry as status fields and never
/// abort a load.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Verification was aborted by request; no partial results were
    /// published.
    #[error("verification cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A verification worker died unexpectedly.
    #[error("verification worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
