use crate::consensus::{CommitStream, CommittedEntry};
use crate::server::command::{Command, CommandKind};
use crate::server::shutdown::ApplyLoopShutdownSignal;
use crate::server::state::SharedState;
use std::sync::{Arc, Mutex};

/// ApplyLoop is the single sequential consumer of the committed-command stream and
/// the only writer of the store and session tracker. All mutation funnels through
/// here, in commit order, which is what makes the deduplication logic sound without
/// any per-key locking.
pub(crate) struct ApplyLoop {
    logger: slog::Logger,
    shared: Arc<Mutex<SharedState>>,
    commit_stream: CommitStream,
    shutdown_signal: ApplyLoopShutdownSignal,
}

impl ApplyLoop {
    pub(crate) fn new(
        logger: slog::Logger,
        shared: Arc<Mutex<SharedState>>,
        commit_stream: CommitStream,
        shutdown_signal: ApplyLoopShutdownSignal,
    ) -> Self {
        ApplyLoop {
            logger,
            shared,
            commit_stream,
            shutdown_signal,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = &mut self.shutdown_signal => {
                    slog::info!(self.logger, "Apply loop received shutdown signal. Exiting.");
                    return;
                }
                opt_entry = self.commit_stream.next() => match opt_entry {
                    Some(entry) => self.apply_committed_entry(entry),
                    None => {
                        slog::info!(self.logger, "Commit stream has closed. Apply loop exiting.");
                        return;
                    }
                },
            }
        }
    }

    fn apply_committed_entry(&mut self, entry: CommittedEntry) {
        // Only this crate's coordinators produce log entries, so an undecodable
        // entry is a consensus contract breach, not a routine fault.
        let command = match Command::decode(entry.data) {
            Ok(command) => command,
            Err(decode_err) => {
                slog::crit!(
                    self.logger,
                    "Undecodable command at index {:?}: {}",
                    entry.index,
                    decode_err
                );
                panic!("undecodable command at index {:?}: {}", entry.index, decode_err);
            }
        };

        let mut shared = SharedState::lock(&self.shared);

        // Consensus contract: one delivery per index, in strictly increasing index
        // order. (Snapshot installation resets the watermark.)
        if let Some(last_applied) = shared.last_applied {
            if entry.index <= last_applied {
                slog::crit!(
                    self.logger,
                    "Commit stream delivered index {:?} at or before already-applied index {:?}.",
                    entry.index,
                    last_applied
                );
                panic!(
                    "commit stream delivered out-of-order index {:?} after {:?}",
                    entry.index, last_applied
                );
            }
        }
        shared.last_applied = Some(entry.index);

        if shared.sessions.is_duplicate(command.session_id, command.request_id) {
            slog::debug!(
                self.logger,
                "Index {:?}: request {:?} from session {:?} already applied, skipping mutation.",
                entry.index,
                command.request_id,
                command.session_id
            );
        } else {
            match command.kind {
                CommandKind::Put => shared.store.put(command.key.clone(), command.value.clone()),
                CommandKind::Append => shared.store.append(command.key.clone(), &command.value),
                CommandKind::Get => { /* Reads mutate nothing; they ride the log for freshness. */ }
            }
        }

        // Recorded for every kind, Get included, so duplicate Gets are recognized
        // too. The tracker is forward-only, so re-recording a duplicate is harmless.
        shared.sessions.record(command.session_id, command.request_id);

        shared.waiters.publish(entry.index, command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{create_commit_stream, Index};
    use crate::server::command::{RequestId, SessionId};
    use crate::server::shutdown;

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn append_entry(index: u64, value: &str, request_id: u64) -> CommittedEntry {
        let command = Command::write(
            CommandKind::Append,
            "x".into(),
            value.into(),
            SessionId::new(1),
            RequestId::new(request_id),
        );
        CommittedEntry {
            index: Index::new(index),
            data: command.encode(),
        }
    }

    #[tokio::test]
    async fn retransmitted_entry_is_applied_exactly_once() {
        let shared = Arc::new(Mutex::new(SharedState::new()));
        let (publisher, commit_stream) = create_commit_stream();
        let (_shutdown_handle, shutdown_sig) = shutdown::shutdown_signal();
        let logger = test_logger();
        tokio::spawn(ApplyLoop::new(logger.clone(), shared.clone(), commit_stream, shutdown_sig).run());

        // The entry at index 2 is a retransmission of the request at index 1: same
        // session, same request id. Only one "a" may land in the store.
        publisher.notify_commit(&logger, append_entry(1, "a", 1));
        publisher.notify_commit(&logger, append_entry(2, "a", 1));
        publisher.notify_commit(&logger, append_entry(3, "b", 2));

        let mut receiver = SharedState::lock(&shared).waiters.subscribe(Index::new(3));
        if receiver.borrow().is_none() {
            receiver.changed().await.unwrap();
        }

        assert_eq!(SharedState::lock(&shared).store.get("x"), "ab");
    }

    #[tokio::test]
    async fn waiter_receives_the_command_committed_at_its_index() {
        let shared = Arc::new(Mutex::new(SharedState::new()));
        let (publisher, commit_stream) = create_commit_stream();
        let (_shutdown_handle, shutdown_sig) = shutdown::shutdown_signal();
        let logger = test_logger();
        tokio::spawn(ApplyLoop::new(logger.clone(), shared.clone(), commit_stream, shutdown_sig).run());

        let mut receiver = SharedState::lock(&shared).waiters.subscribe(Index::new(1));
        let expected = Command::get("x".into(), SessionId::new(9), RequestId::new(4));
        publisher.notify_commit(
            &logger,
            CommittedEntry {
                index: Index::new(1),
                data: expected.encode(),
            },
        );

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), Some(expected));
    }

    #[tokio::test]
    async fn dropping_shutdown_handle_stops_the_loop() {
        let shared = Arc::new(Mutex::new(SharedState::new()));
        let (_publisher, commit_stream) = create_commit_stream();
        let (shutdown_handle, shutdown_sig) = shutdown::shutdown_signal();
        let join_handle =
            tokio::spawn(ApplyLoop::new(test_logger(), shared.clone(), commit_stream, shutdown_sig).run());

        drop(shutdown_handle);

        join_handle.await.unwrap();
    }
}
