mod api;
mod commit_stream;
mod in_memory;

pub use api::CommandLog;
pub use api::Index;
pub use api::SubmitError;
pub use api::SubmitInput;
pub use api::SubmitOutput;
pub use api::Term;
pub use commit_stream::create_commit_stream;
pub use commit_stream::CommitStream;
pub use commit_stream::CommitStreamPublisher;
pub use commit_stream::CommittedEntry;
pub use in_memory::InMemoryCommandLog;
