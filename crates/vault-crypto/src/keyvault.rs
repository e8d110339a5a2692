use std::sync::Mutex;

use crate::error::CryptoError;

/// Durable holder of the signing key material.
///
/// Implementations must satisfy these invariants:
/// - Material is stored encrypted at rest; plaintext only ever crosses this
///   boundary in memory.
/// - `load_key` returns `Ok(None)` on first run — absence is not an error,
///   the engine generates and persists a key through `store_key`.
/// - `store_key` is durable before it returns.
pub trait KeyVault: Send + Sync {
    /// Load the key, or `None` if no key has been stored yet.
    fn load_key(&self) -> Result<Option<Vec<u8>>, CryptoError>;

    /// Persist the key.
    fn store_key(&self, key: &[u8]) -> Result<(), CryptoError>;
}

/// In-memory vault for tests and embedding.
#[derive(Default)]
pub struct MemoryKeyVault {
    key: Mutex<Option<Vec<u8>>>,
}

impl MemoryKeyVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vault pre-seeded with key material.
    pub fn with_key(key: Vec<u8>) -> Self {
        Self {
            key: Mutex::new(Some(key)),
        }
    }
}

impl KeyVault for MemoryKeyVault {
    fn load_key(&self) -> Result<Option<Vec<u8>>, CryptoError> {
        let guard = self
            .key
            .lock()
            .map_err(|_| CryptoError::Vault("vault lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn store_key(&self, key: &[u8]) -> Result<(), CryptoError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|_| CryptoError::Vault("vault lock poisoned".into()))?;
        *guard = Some(key.to_vec());
        Ok(())
    }
}
