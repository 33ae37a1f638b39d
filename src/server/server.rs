use crate::api::{GetInput, GetOutput, KvError, PutAppendInput, PutAppendOutput};
use crate::consensus::{CommandLog, Index, SubmitInput};
use crate::server::command::Command;
use crate::server::shutdown::ApplyLoopShutdownHandle;
use crate::server::snapshot;
use crate::server::snapshot::SnapshotError;
use crate::server::state::SharedState;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// KvServer is the request coordinator: it turns one client request into a command,
/// submits it to the consensus module, and waits (bounded) for the commit
/// notification to decide whether *this* server's submission is the one that
/// actually got committed.
///
/// Cloning is cheap; clones share the same underlying state, so one clone per
/// concurrent RPC handler task is the intended usage. The apply loop stops when the
/// last clone is dropped.
#[derive(Clone)]
pub struct KvServer {
    logger: slog::Logger,
    command_log: Arc<dyn CommandLog>,
    shared: Arc<Mutex<SharedState>>,
    commit_wait_timeout: Duration,
    max_state_size: Option<usize>,
    _apply_loop_shutdown: Arc<ApplyLoopShutdownHandle>,
}

impl KvServer {
    pub(crate) fn new(
        logger: slog::Logger,
        command_log: Arc<dyn CommandLog>,
        shared: Arc<Mutex<SharedState>>,
        commit_wait_timeout: Duration,
        max_state_size: Option<usize>,
        apply_loop_shutdown: ApplyLoopShutdownHandle,
    ) -> Self {
        KvServer {
            logger,
            command_log,
            shared,
            commit_wait_timeout,
            max_state_size,
            _apply_loop_shutdown: Arc::new(apply_loop_shutdown),
        }
    }

    /// Linearizable read. The Get rides the log like any write: only after the
    /// command commits and is applied locally do we read the store, which is what
    /// prevents a stale or partitioned leader from answering from outdated state.
    pub async fn get(&self, input: GetInput) -> Result<GetOutput, KvError> {
        let command = Command::get(input.key, input.session_id, input.request_id);
        let key = command.key.clone();
        self.replicate_and_await_commit(command).await?;

        let mut shared = SharedState::lock(&self.shared);
        let value = shared.store.get(&key);
        // The apply loop already recorded this request; re-recording is a forward-only
        // no-op but keeps duplicate Gets recognized even if the apply-side record and
        // this reply race a snapshot install.
        shared.sessions.record(input.session_id, input.request_id);

        Ok(GetOutput { value })
    }

    /// Put or Append. On success the mutation is already visible to subsequent Gets:
    /// the commit notification only fires after the apply loop mutated the store.
    pub async fn put_append(&self, input: PutAppendInput) -> Result<PutAppendOutput, KvError> {
        let command = Command::write(
            input.kind.into(),
            input.key,
            input.value,
            input.session_id,
            input.request_id,
        );
        self.replicate_and_await_commit(command).await?;

        Ok(PutAppendOutput {})
    }

    async fn replicate_and_await_commit(&self, command: Command) -> Result<(), KvError> {
        let submit_output = match self.command_log.submit(SubmitInput { data: command.encode() }).await {
            Ok(output) => output,
            Err(submit_err) => {
                slog::debug!(self.logger, "Submission rejected: {}", submit_err);
                return Err(KvError::WrongLeader);
            }
        };
        let index = submit_output.index;

        let mut receiver = SharedState::lock(&self.shared).waiters.subscribe(index);

        // The commit may have landed between submission and subscribing; the slot
        // retains the most recent commit for the index, so check before parking.
        let already_committed = receiver.borrow().clone();
        if let Some(committed) = already_committed {
            return self.confirm(index, &committed, &command);
        }

        match tokio::time::timeout(self.commit_wait_timeout, receiver.changed()).await {
            Ok(Ok(())) => {
                let committed = receiver.borrow().clone();
                match committed {
                    Some(committed) => self.confirm(index, &committed, &command),
                    // The registry only ever publishes Some; a change back to None is
                    // a reset slot, handled like any lost notification.
                    None => Err(KvError::WrongLeader),
                }
            }
            Ok(Err(_closed)) => {
                // Registry was reset (snapshot install) or the apply loop exited.
                slog::debug!(self.logger, "Waiter slot for index {:?} closed while parked.", index);
                Err(KvError::WrongLeader)
            }
            Err(_elapsed) => {
                // The submission's fate is unresolved. Abandoning the wait is safe:
                // if it commits later, dedup makes the client's retry idempotent.
                slog::debug!(
                    self.logger,
                    "No commit observed at index {:?} within {:?}.",
                    index,
                    self.commit_wait_timeout
                );
                Err(KvError::WrongLeader)
            }
        }
    }

    fn confirm(&self, index: Index, committed: &Command, submitted: &Command) -> Result<(), KvError> {
        if committed == submitted {
            Ok(())
        } else {
            slog::debug!(
                self.logger,
                "A different command committed at index {:?}; leadership changed mid-flight.",
                index
            );
            Err(KvError::WrongLeader)
        }
    }

    /// take_snapshot serializes {store, session tracker} for the consensus module to
    /// compact the log behind. The snapshot checkpoint also bounds the waiter
    /// registry: slots for indexes the apply loop has already passed are swept here.
    pub fn take_snapshot(&self) -> Bytes {
        let mut shared = SharedState::lock(&self.shared);
        let snapshot_bytes = snapshot::serialize(&shared.store, &shared.sessions);

        if let Some(last_applied) = shared.last_applied {
            shared.waiters.compact_through(last_applied);
        }

        snapshot_bytes
    }

    /// install_snapshot replaces the derived state wholesale. Waiters parked on
    /// pre-snapshot indexes are disconnected and report `WrongLeader`.
    pub fn install_snapshot(&self, snapshot_bytes: Bytes) -> Result<(), SnapshotError> {
        let (store, sessions) = snapshot::deserialize(snapshot_bytes)?;

        let mut shared = SharedState::lock(&self.shared);
        shared.store = store;
        shared.sessions = sessions;
        shared.waiters.reset();
        // The consensus module resumes delivery from the snapshot's position, so the
        // apply-order watermark starts over with it.
        shared.last_applied = None;
        slog::info!(self.logger, "Installed snapshot.");

        Ok(())
    }

    /// should_snapshot applies the configured threshold to the consensus module's
    /// reported log size. Snapshot triggering and transport stay on the consensus
    /// side; this only answers "is it time".
    pub fn should_snapshot(&self, log_size_bytes: usize) -> bool {
        match self.max_state_size {
            Some(max_state_size) => log_size_bytes >= max_state_size,
            None => false,
        }
    }
}
