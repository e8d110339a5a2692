/// Errors from key management and signing setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The signing key could not be loaded, generated, or persisted.
    /// Fatal at startup: nothing can be signed or verified without it.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// The key vault collaborator failed.
    #[error("key vault failure: {0}")]
    Vault(String),
}
