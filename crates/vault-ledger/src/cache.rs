use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;
use vault_types::Entry;

/// How long a loaded history stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Time-boxed holder of the last verified, ordered entry list.
///
/// One mutex guards the list and its load instant. Readers get either the
/// previous complete list or the next complete list, never an intermediate
/// state: `set` replaces the whole vector under the lock and `get` hands out
/// a copy. Refresh orchestration (single-flight) lives with the caller — the
/// cache itself only answers validity and holds data.
pub struct LedgerCache {
    inner: Mutex<CacheState>,
    ttl: Duration,
}

#[derive(Default)]
struct CacheState {
    entries: Vec<Entry>,
    loaded_at: Option<Instant>,
}

impl LedgerCache {
    /// A cache with the production TTL.
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    /// A cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheState::default()),
            ttl,
        }
    }

    /// True iff the cache holds a non-empty list younger than the TTL.
    pub fn is_valid(&self) -> bool {
        let state = self.lock();
        Self::is_valid_locked(&state, self.ttl)
    }

    /// The held list if valid, otherwise an empty list. An expired cache
    /// never leaks stale entries; callers are expected to refresh.
    pub fn get(&self) -> Vec<Entry> {
        let state = self.lock();
        if Self::is_valid_locked(&state, self.ttl) {
            state.entries.clone()
        } else {
            Vec::new()
        }
    }

    /// The last entry of the held list if valid.
    pub fn tail(&self) -> Option<Entry> {
        let state = self.lock();
        if Self::is_valid_locked(&state, self.ttl) {
            state.entries.last().cloned()
        } else {
            None
        }
    }

    /// Publish a freshly verified list and restart the TTL clock.
    pub fn set(&self, entries: Vec<Entry>) {
        let mut state = self.lock();
        debug!(count = entries.len(), "cache set");
        state.entries = entries;
        state.loaded_at = Some(Instant::now());
    }

    /// Drop the held list (e.g. on account wipe).
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.entries.clear();
    }

    /// Append a single entry, but only to a currently valid cache. An
    /// invalid cache is left untouched so a stale or empty view is never
    /// extended with a partial one; the next full refresh picks the entry
    /// up from the store.
    pub fn append_if_valid(&self, entry: Entry) {
        let mut state = self.lock();
        if !Self::is_valid_locked(&state, self.ttl) {
            return;
        }
        state.entries.push(entry);
    }

    fn is_valid_locked(state: &CacheState, ttl: Duration) -> bool {
        match state.loaded_at {
            Some(loaded_at) => !state.entries.is_empty() && loaded_at.elapsed() < ttl,
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A panic while holding the lock leaves plain data; recover it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new()
    }
}
