//! Cryptographic core for LedgerVault.
//!
//! Provides the canonical byte encodings of an entry, SHA-256 content and
//! chain-link hashing, and HMAC-SHA256 entry signing keyed by vault-held
//! material.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod canonical;
pub mod error;
pub mod hasher;
pub mod keyvault;
pub mod signer;

pub use canonical::{canonical_bytes, signing_payload};
pub use error::CryptoError;
pub use hasher::IntegrityHasher;
pub use keyvault::{KeyVault, MemoryKeyVault};
pub use signer::SignatureService;
