use crate::consensus::Index;
use crate::server::command::Command;
use std::collections::HashMap;
use tokio::sync::watch;

/// CommitWaiterRegistry holds one single-slot notification cell per log index. The
/// apply loop is the producer; request handler tasks are the consumers.
///
/// Each cell is a watch channel, which gives the two properties the handoff needs
/// without holding any lock while blocked:
/// - publishing drains any stale unconsumed value before installing the new one
///   (last write wins), so a slot never surfaces a command from an older commit at
///   that index than the most recent;
/// - a waiter that subscribes after the commit landed can still read the current
///   value, rather than block forever on a notification that already fired.
///
/// Slots are created lazily by whichever side arrives first (followers apply entries
/// with no local waiter). Growth is bounded by the snapshot cycle: taking a snapshot
/// sweeps slots at or below the checkpoint, and installing one drops the registry
/// wholesale.
pub(crate) struct CommitWaiterRegistry {
    slots: HashMap<Index, watch::Sender<Option<Command>>>,
}

impl CommitWaiterRegistry {
    pub(crate) fn new() -> Self {
        CommitWaiterRegistry { slots: HashMap::new() }
    }

    pub(crate) fn subscribe(&mut self, index: Index) -> watch::Receiver<Option<Command>> {
        self.slot(index).subscribe()
    }

    pub(crate) fn publish(&mut self, index: Index, command: Command) {
        self.slot(index).send_replace(Some(command));
    }

    /// Drop every slot. Parked waiters observe a closed channel and report a
    /// retryable failure.
    pub(crate) fn reset(&mut self) {
        self.slots.clear();
    }

    /// Sweep keyed to the snapshot checkpoint: every slot at or below `bound` has
    /// already had its commit published, so nothing can still be waiting for a first
    /// value there. Dropping them bounds registry growth between snapshots. A waiter
    /// arriving for a swept index afterwards gets a fresh empty slot and resolves by
    /// timeout, the same as any waiter that missed its notification.
    pub(crate) fn compact_through(&mut self, bound: Index) {
        self.slots.retain(|index, _| *index > bound);
    }

    fn slot(&mut self, index: Index) -> &watch::Sender<Option<Command>> {
        self.slots.entry(index).or_insert_with(|| watch::channel(None).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::command::{CommandKind, RequestId, SessionId};
    use tokio::time::Duration;

    fn command(value: &str) -> Command {
        Command::write(
            CommandKind::Put,
            "k".into(),
            value.into(),
            SessionId::new(1),
            RequestId::new(1),
        )
    }

    #[tokio::test]
    async fn parked_waiter_is_notified() {
        let mut registry = CommitWaiterRegistry::new();
        let mut receiver = registry.subscribe(Index::new(1));

        registry.publish(Index::new(1), command("a"));

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), Some(command("a")));
    }

    #[tokio::test]
    async fn publish_drains_stale_value_before_installing() {
        let mut registry = CommitWaiterRegistry::new();

        // Two commits land at the same index with nobody waiting (leadership change
        // re-used the index). Only the most recent is visible afterwards.
        registry.publish(Index::new(1), command("old"));
        registry.publish(Index::new(1), command("new"));

        let receiver = registry.subscribe(Index::new(1));
        assert_eq!(*receiver.borrow(), Some(command("new")));
    }

    #[tokio::test]
    async fn late_subscriber_reads_current_value_without_notification() {
        let mut registry = CommitWaiterRegistry::new();
        registry.publish(Index::new(1), command("a"));

        let mut receiver = registry.subscribe(Index::new(1));

        // The value is visible via borrow...
        assert_eq!(*receiver.borrow(), Some(command("a")));
        // ...but no change notification is pending.
        let changed = tokio::time::timeout(Duration::from_millis(20), receiver.changed()).await;
        assert!(changed.is_err(), "expected no pending notification");
    }

    #[tokio::test]
    async fn compact_drops_slots_at_or_below_the_bound() {
        let mut registry = CommitWaiterRegistry::new();
        registry.publish(Index::new(1), command("a"));
        registry.publish(Index::new(2), command("b"));
        registry.publish(Index::new(3), command("c"));

        registry.compact_through(Index::new(2));

        // Swept indexes surface an empty slot; the surviving index keeps its value.
        assert_eq!(*registry.subscribe(Index::new(1)).borrow(), None);
        assert_eq!(*registry.subscribe(Index::new(3)).borrow(), Some(command("c")));
    }

    #[tokio::test]
    async fn reset_closes_parked_waiters() {
        let mut registry = CommitWaiterRegistry::new();
        let mut receiver = registry.subscribe(Index::new(1));

        registry.reset();

        assert!(receiver.changed().await.is_err());
    }
}
