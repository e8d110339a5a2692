use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use tracing::info;

use crate::error::CryptoError;
use crate::keyvault::KeyVault;

type HmacSha256 = Hmac<Sha256>;

/// Generated key length in bytes.
const KEY_LEN: usize = 32;

/// Keyed entry signing.
///
/// Holds one HMAC-SHA256 key for the process lifetime, loaded from the key
/// vault at startup or generated (cryptographically random, 256 bits) and
/// persisted on first run. Verification recomputes the MAC and compares it
/// in constant time; it never short-circuits byte-by-byte.
pub struct SignatureService {
    mac: HmacSha256,
}

impl SignatureService {
    /// Load the signing key from the vault, generating and persisting one
    /// if absent. Any vault failure is fatal: the engine cannot run unkeyed.
    pub fn open(vault: &dyn KeyVault) -> Result<Self, CryptoError> {
        let key = match vault
            .load_key()
            .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?
        {
            Some(key) if !key.is_empty() => key,
            Some(_) => {
                return Err(CryptoError::KeyUnavailable(
                    "vault returned empty key material".into(),
                ))
            }
            None => {
                let mut key = vec![0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                vault
                    .store_key(&key)
                    .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;
                info!("generated new signing key");
                key
            }
        };

        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Compute the raw MAC over a payload.
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Compute the MAC in its base64 wire form.
    pub fn sign_base64(&self, payload: &[u8]) -> String {
        BASE64.encode(self.sign(payload))
    }

    /// Verify a raw MAC in constant time.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    }

    /// Verify a base64-encoded MAC. Malformed base64 verifies false, it is
    /// never an error.
    pub fn verify_base64(&self, payload: &[u8], signature: &str) -> bool {
        match BASE64.decode(signature) {
            Ok(raw) => self.verify(payload, &raw),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for SignatureService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureService(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use crate::keyvault::MemoryKeyVault;

    use super::*;

    #[test]
    fn first_open_generates_and_persists_a_key() {
        let vault = MemoryKeyVault::new();
        let _signer = SignatureService::open(&vault).unwrap();

        let stored = vault.load_key().unwrap().expect("key persisted");
        assert_eq!(stored.len(), KEY_LEN);
    }

    #[test]
    fn reopen_reuses_the_stored_key() {
        let vault = MemoryKeyVault::new();
        let first = SignatureService::open(&vault).unwrap();
        let second = SignatureService::open(&vault).unwrap();

        let payload = b"same payload";
        assert_eq!(first.sign(payload), second.sign(payload));
    }

    #[test]
    fn sign_is_deterministic() {
        let signer = SignatureService::open(&MemoryKeyVault::with_key(vec![9u8; 32])).unwrap();
        assert_eq!(signer.sign(b"payload"), signer.sign(b"payload"));
    }

    #[test]
    fn verify_accepts_own_signature() {
        let vault = MemoryKeyVault::new();
        let signer = SignatureService::open(&vault).unwrap();
        let mac = signer.sign(b"payload");
        assert!(signer.verify(b"payload", &mac));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signer = SignatureService::open(&MemoryKeyVault::new()).unwrap();
        let mac = signer.sign(b"payload");
        assert!(!signer.verify(b"tampered", &mac));
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let ours = SignatureService::open(&MemoryKeyVault::with_key(vec![1u8; 32])).unwrap();
        let theirs = SignatureService::open(&MemoryKeyVault::with_key(vec![2u8; 32])).unwrap();
        let mac = theirs.sign(b"payload");
        assert!(!ours.verify(b"payload", &mac));
    }

    #[test]
    fn base64_roundtrip() {
        let signer = SignatureService::open(&MemoryKeyVault::new()).unwrap();
        let wire = signer.sign_base64(b"payload");
        assert!(signer.verify_base64(b"payload", &wire));
    }

    #[test]
    fn malformed_base64_verifies_false() {
        let signer = SignatureService::open(&MemoryKeyVault::new()).unwrap();
        assert!(!signer.verify_base64(b"payload", "not-base64!!!"));
    }

    #[test]
    fn empty_vault_key_is_fatal() {
        let vault = MemoryKeyVault::with_key(Vec::new());
        let err = SignatureService::open(&vault).unwrap_err();
        assert!(matches!(err, CryptoError::KeyUnavailable(_)));
    }

    #[test]
    fn debug_redacts_key_material() {
        let signer = SignatureService::open(&MemoryKeyVault::new()).unwrap();
        assert!(format!("{signer:?}").contains("redacted"));
    }
}
