use crate::server::command::{RequestId, SessionId};
use std::collections::HashMap;

/// SessionTracker remembers, per client session, the highest request id that has been
/// applied to the store. The apply loop processes committed entries in a single total
/// order, so "highest applied" is well defined and is all the state deduplication
/// needs.
pub(crate) struct SessionTracker {
    last_applied: HashMap<SessionId, RequestId>,
}

impl SessionTracker {
    pub(crate) fn new() -> Self {
        SessionTracker {
            last_applied: HashMap::new(),
        }
    }

    /// True iff a request id >= the given one has already been applied for this
    /// session. A session we've never seen is never a duplicate.
    pub(crate) fn is_duplicate(&self, session_id: SessionId, request_id: RequestId) -> bool {
        match self.last_applied.get(&session_id) {
            Some(applied) => *applied >= request_id,
            None => false,
        }
    }

    /// Advance the session's high-water mark. The tracker only ever moves forward: a
    /// lower request id arriving late (duplicate delivery, defensive re-record) must
    /// not clobber a higher recorded value.
    pub(crate) fn record(&mut self, session_id: SessionId, request_id: RequestId) {
        let entry = self.last_applied.entry(session_id).or_insert(request_id);
        if *entry < request_id {
            *entry = request_id;
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&SessionId, &RequestId)> {
        self.last_applied.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_is_not_duplicate() {
        let tracker = SessionTracker::new();

        assert!(!tracker.is_duplicate(SessionId::new(5), RequestId::new(1)));
    }

    #[test]
    fn equal_and_lower_request_ids_are_duplicates() {
        let mut tracker = SessionTracker::new();
        tracker.record(SessionId::new(5), RequestId::new(3));

        assert!(tracker.is_duplicate(SessionId::new(5), RequestId::new(2)));
        assert!(tracker.is_duplicate(SessionId::new(5), RequestId::new(3)));
        assert!(!tracker.is_duplicate(SessionId::new(5), RequestId::new(4)));
        // Other sessions are unaffected.
        assert!(!tracker.is_duplicate(SessionId::new(6), RequestId::new(1)));
    }

    #[test]
    fn record_never_moves_backwards() {
        let mut tracker = SessionTracker::new();
        tracker.record(SessionId::new(5), RequestId::new(3));

        // A stale re-record of an earlier request must not re-open the dedup window.
        tracker.record(SessionId::new(5), RequestId::new(1));

        assert!(tracker.is_duplicate(SessionId::new(5), RequestId::new(3)));
    }
}
