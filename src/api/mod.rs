//! This mod is meant to hold most of the code for the crate's client-facing API.
mod options;
mod session;
mod types;
mod wiring;

pub use options::KvOptions;
pub use session::ClientSession;
pub use types::GetInput;
pub use types::GetOutput;
pub use types::KvError;
pub use types::PutAppendInput;
pub use types::PutAppendOutput;
pub use types::WriteKind;
pub use wiring::try_create_kv_server;
pub use wiring::KvServerConfig;
pub use wiring::KvServerCreationError;
