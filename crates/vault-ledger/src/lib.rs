//! The LedgerVault integrity engine.
//!
//! Everything that makes the ledger tamper-evident lives here:
//! - [`VerificationPipeline`] — concurrent re-verification of the stored
//!   history with deterministic chain-break propagation
//! - [`LedgerCache`] — time-boxed read cache over the verified list
//! - [`LedgerWriter`] — the append path: chain, hash, sign, persist
//! - [`AttachmentStore`] — managed receipt storage and content hashing
//! - [`LedgerService`] — the assembled engine with single-flight refresh
//!
//! Integrity failures are data, not errors: they ride on each entry as
//! status fields so a damaged ledger still loads and displays in full.

pub mod attachments;
pub mod cache;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod writer;

pub use attachments::AttachmentStore;
pub use cache::{LedgerCache, CACHE_TTL};
pub use error::{LedgerError, LedgerResult};
pub use pipeline::{PipelineConfig, VerificationPipeline};
pub use service::LedgerService;
pub use writer::{LedgerWriter, NewEntry};
