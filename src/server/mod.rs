mod apply_loop;
mod command;
mod server;
mod session;
mod shutdown;
mod snapshot;
mod state;
mod store;
mod waiters;

pub use command::RequestId;
pub use command::SessionId;
pub use server::KvServer;
pub use snapshot::SnapshotError;

// So the wiring can assemble the server and its apply loop.
pub(crate) use apply_loop::ApplyLoop;
pub(crate) use command::CommandKind;
pub(crate) use shutdown::shutdown_signal;
pub(crate) use state::SharedState;
