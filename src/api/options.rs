use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Default)]
pub struct KvOptions {
    /// How long a request handler waits for its submission's commit notification
    /// before giving up and telling the caller to retry. Long enough to cover one
    /// election plus a replication round; short enough to bound client latency.
    pub commit_wait_timeout: Option<Duration>,

    /// Consensus log size (bytes) at which the server starts answering
    /// `should_snapshot` with true. None disables snapshotting.
    pub max_state_size: Option<usize>,
}

pub(super) struct KvOptionsValidated {
    pub commit_wait_timeout: Duration,
    pub max_state_size: Option<usize>,
}

impl KvOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.commit_wait_timeout.as_millis() == 0 {
            return Err("Commit wait timeout must be greater than zero");
        }
        if self.max_state_size == Some(0) {
            return Err("Max state size must be greater than zero; use None to disable snapshotting");
        }

        Ok(())
    }
}

impl TryFrom<KvOptions> for KvOptionsValidated {
    type Error = &'static str;

    fn try_from(options: KvOptions) -> Result<Self, Self::Error> {
        let values = KvOptionsValidated {
            commit_wait_timeout: options.commit_wait_timeout.unwrap_or(Duration::from_secs(1)),
            max_state_size: options.max_state_size,
        };

        values.validate()?;
        Ok(values)
    }
}
