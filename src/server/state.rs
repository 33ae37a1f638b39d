use crate::consensus::Index;
use crate::server::session::SessionTracker;
use crate::server::store::KeyValueStore;
use crate::server::waiters::CommitWaiterRegistry;
use std::sync::{Mutex, MutexGuard};

/// SharedState is the single mutual-exclusion domain shared by the apply loop and
/// the request handler tasks. The apply loop is the only writer of `store` and
/// `sessions`; handlers read the store for Get replies and touch `waiters` to park.
/// Critical sections are map operations only. Blocking waits happen outside the
/// lock, on the watch receiver handed out by the registry.
pub(crate) struct SharedState {
    pub(crate) store: KeyValueStore,
    pub(crate) sessions: SessionTracker,
    pub(crate) waiters: CommitWaiterRegistry,
    /// Highest index the apply loop has processed. Doubles as the commit-order
    /// invariant check and as the compaction bound for the waiter registry.
    pub(crate) last_applied: Option<Index>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        SharedState {
            store: KeyValueStore::new(),
            sessions: SessionTracker::new(),
            waiters: CommitWaiterRegistry::new(),
            last_applied: None,
        }
    }

    pub(crate) fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
        shared.lock().expect("SharedState mutex guard poison")
    }
}
