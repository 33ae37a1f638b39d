use crate::api::options::{KvOptions, KvOptionsValidated};
use crate::consensus::{CommandLog, CommitStream};
use crate::server::{shutdown_signal, ApplyLoop, KvServer, SharedState};
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};

pub struct KvServerConfig {
    /// The submission half of the consensus module.
    pub command_log: Arc<dyn CommandLog>,
    /// The ordered committed-entry stream from the same consensus module.
    pub commit_stream: CommitStream,
    pub info_logger: slog::Logger,
    pub options: KvOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum KvServerCreationError {
    #[error("Illegal options for configuring server: {0}")]
    IllegalOptions(String),
}

/// Build a KvServer and spawn its apply loop. The loop runs until the last clone of
/// the returned server is dropped, or until the consensus module closes the commit
/// stream.
pub fn try_create_kv_server(config: KvServerConfig) -> Result<KvServer, KvServerCreationError> {
    let options =
        KvOptionsValidated::try_from(config.options).map_err(|e| KvServerCreationError::IllegalOptions(e.to_string()))?;

    let shared = Arc::new(Mutex::new(SharedState::new()));
    let (apply_loop_shutdown_handle, apply_loop_shutdown_signal) = shutdown_signal();

    let apply_loop = ApplyLoop::new(
        config.info_logger.clone(),
        shared.clone(),
        config.commit_stream,
        apply_loop_shutdown_signal,
    );
    tokio::spawn(apply_loop.run());

    Ok(KvServer::new(
        config.info_logger,
        config.command_log,
        shared,
        options.commit_wait_timeout,
        options.max_state_size,
        apply_loop_shutdown_handle,
    ))
}
