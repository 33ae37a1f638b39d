mod api;
mod consensus;
mod server;

pub use api::try_create_kv_server;
pub use api::ClientSession;
pub use api::GetInput;
pub use api::GetOutput;
pub use api::KvError;
pub use api::KvOptions;
pub use api::KvServerConfig;
pub use api::KvServerCreationError;
pub use api::PutAppendInput;
pub use api::PutAppendOutput;
pub use api::WriteKind;
pub use consensus::create_commit_stream;
pub use consensus::CommandLog;
pub use consensus::CommitStream;
pub use consensus::CommitStreamPublisher;
pub use consensus::CommittedEntry;
pub use consensus::InMemoryCommandLog;
pub use consensus::Index;
pub use consensus::SubmitError;
pub use consensus::SubmitInput;
pub use consensus::SubmitOutput;
pub use consensus::Term;
pub use server::KvServer;
pub use server::RequestId;
pub use server::SessionId;
pub use server::SnapshotError;
