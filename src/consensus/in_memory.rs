use crate::consensus::api::{CommandLog, Index, SubmitError, SubmitInput, SubmitOutput, Term};
use crate::consensus::commit_stream::{create_commit_stream, CommitStream, CommitStreamPublisher, CommittedEntry};
use bytes::Bytes;
use std::sync::Mutex;

/// InMemoryCommandLog is a single-replica stand-in for a real consensus cluster. It
/// accepts submissions, assigns increasing indexes, and publishes commits to the
/// stream in order. Useful for local development and for driving the server through
/// the failure modes a real cluster would produce: leadership loss, commits that
/// never arrive, and a new leader overwriting pending entries.
pub struct InMemoryCommandLog {
    logger: slog::Logger,
    publisher: CommitStreamPublisher,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: Vec<Bytes>,
    // Number of entries already published to the commit stream. Entries beyond this
    // point are accepted but not yet committed.
    committed: usize,
    term: u64,
    leader: bool,
    hold_commits: bool,
}

impl InMemoryCommandLog {
    pub fn create(logger: slog::Logger) -> (Self, CommitStream) {
        let (publisher, commit_stream) = create_commit_stream();

        let log = InMemoryCommandLog {
            logger,
            publisher,
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                committed: 0,
                term: 1,
                leader: true,
                hold_commits: false,
            }),
        };

        (log, commit_stream)
    }

    /// Toggle whether this replica believes it is leader. While false, submissions
    /// are rejected fail-fast.
    pub fn set_leader(&self, leader: bool) {
        self.lock_inner().leader = leader;
    }

    /// Accept submissions but stop publishing commits, as a partitioned leader would.
    pub fn hold_commits(&self) {
        self.lock_inner().hold_commits = true;
    }

    /// Publish every accepted-but-uncommitted entry, in order, and resume normal
    /// commit behavior.
    pub fn release_commits(&self) {
        let mut inner = self.lock_inner();
        inner.hold_commits = false;
        self.publish_pending(&mut inner);
    }

    /// Simulate a leadership change: every accepted-but-uncommitted entry is
    /// discarded, and subsequent submissions re-use the discarded indexes under a
    /// new term. A waiter parked on a discarded index will observe whatever the
    /// "new leader" commits there instead.
    pub fn depose(&self) {
        let mut inner = self.lock_inner();
        let committed = inner.committed;
        inner.entries.truncate(committed);
        inner.term += 1;
        inner.hold_commits = false;
    }

    fn publish_pending(&self, inner: &mut Inner) {
        while inner.committed < inner.entries.len() {
            let index = Index::new((inner.committed + 1) as u64);
            let data = inner.entries[inner.committed].clone();
            inner.committed += 1;
            self.publisher.notify_commit(&self.logger, CommittedEntry { index, data });
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("InMemoryCommandLog mutex guard poison")
    }
}

#[async_trait::async_trait]
impl CommandLog for InMemoryCommandLog {
    async fn submit(&self, input: SubmitInput) -> Result<SubmitOutput, SubmitError> {
        let mut inner = self.lock_inner();

        if !inner.leader {
            return Err(SubmitError::NotLeader);
        }

        inner.entries.push(input.data);
        let index = Index::new(inner.entries.len() as u64);
        let term = Term::new(inner.term);

        if !inner.hold_commits {
            self.publish_pending(&mut inner);
        }

        Ok(SubmitOutput { index, term })
    }
}
