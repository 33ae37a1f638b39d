use bytes::Bytes;
use std::fmt;

/// Index is the index of an entry in the replicated log.
///
/// The log indexes entries starting from 1. There will be no entry existing at index 0.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct Index(u64);

impl Index {
    pub fn new(index: u64) -> Self {
        Index(index)
    }

    pub fn start_index() -> Self {
        Index(1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn plus(&self, delta: u64) -> Index {
        Index(self.0 + delta)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Term is the consensus module's election term at the time an entry was accepted.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq)]
pub struct Term(u64);

impl Term {
    pub fn new(term: u64) -> Self {
        Term(term)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CommandLog is the submission half of the consensus module, as seen by this crate.
///
/// Submission is fail-fast: a replica that is not currently leader must reject the
/// command immediately rather than queue it. Acceptance only means the entry has been
/// handed to the consensus module; whether it ever commits is reported separately,
/// through the commit stream.
#[async_trait::async_trait]
pub trait CommandLog: Send + Sync {
    async fn submit(&self, input: SubmitInput) -> Result<SubmitOutput, SubmitError>;
}

#[derive(Debug)]
pub struct SubmitInput {
    pub data: Bytes,
}

#[derive(Debug)]
pub struct SubmitOutput {
    pub index: Index,
    pub term: Term,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    // Caller should retry against a different replica, or the same one after
    // re-resolving leadership.
    #[error("this replica is not the leader")]
    NotLeader,

    // The consensus module's background task has exited.
    #[error("consensus module is unavailable")]
    LogExited,
}
