use serde::{Deserialize, Serialize};

/// Hash verification state of an entry.
///
/// Computed on load, never persisted. `BrokenChain` means the entry's own
/// hash may be fine but an earlier entry in the chain failed verification or
/// linkage; once set it is terminal for that entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashStatus {
    /// Verification has not completed yet.
    #[default]
    InProgress,
    /// The entry's hash and attachment hash both check out.
    Valid,
    /// The recomputed hash (or attachment hash) does not match the stored one.
    Invalid,
    /// A predecessor failed verification or the chain link does not match.
    BrokenChain,
}

/// Signature verification state of an entry.
///
/// Computed on load, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    /// Verification has not completed yet.
    #[default]
    InProgress,
    /// The MAC verifies under the current key.
    Valid,
    /// The MAC does not verify.
    Invalid,
}
