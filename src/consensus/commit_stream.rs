use crate::consensus::api::Index;
use bytes::Bytes;
use tokio::sync::mpsc;

pub fn create_commit_stream() -> (CommitStreamPublisher, CommitStream) {
    let (tx, rx) = mpsc::unbounded_channel();

    let publisher = CommitStreamPublisher { sender: tx };
    let consumer = CommitStream { receiver: rx };

    (publisher, consumer)
}

/// CommitStreamPublisher is held by the consensus module. It must publish each
/// committed index exactly once, in increasing index order.
pub struct CommitStreamPublisher {
    sender: mpsc::UnboundedSender<CommittedEntry>,
}

impl CommitStreamPublisher {
    pub fn notify_commit(&self, logger: &slog::Logger, entry: CommittedEntry) {
        if self.sender.send(entry).is_err() {
            slog::warn!(logger, "CommitStream has disconnected.");
        }
    }
}

/// CommitStream is the ordered stream of committed log entries, consumed by the
/// apply loop on every replica (leader and followers alike).
pub struct CommitStream {
    receiver: mpsc::UnboundedReceiver<CommittedEntry>,
}

#[derive(Debug)]
pub struct CommittedEntry {
    pub index: Index,
    pub data: Bytes,
}

impl CommitStream {
    /// next returns the next committed entry, or None if the consensus module has
    /// dropped its publisher and no further commits will ever arrive.
    pub async fn next(&mut self) -> Option<CommittedEntry> {
        self.receiver.recv().await
    }
}
