use crate::server::{CommandKind, RequestId, SessionId};

#[derive(Debug)]
pub struct GetInput {
    pub key: String,
    pub session_id: SessionId,
    pub request_id: RequestId,
}

#[derive(Debug)]
pub struct GetOutput {
    pub value: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WriteKind {
    Put,
    Append,
}

#[derive(Debug)]
pub struct PutAppendInput {
    pub kind: WriteKind,
    pub key: String,
    pub value: String,
    pub session_id: SessionId,
    pub request_id: RequestId,
}

#[derive(Debug)]
pub struct PutAppendOutput {
    // Nothing. The mutation is visible to subsequent Gets by the time this returns.
}

/// The single client-visible failure. Not-leader rejection, a different command
/// committing at our index after a leadership change, and a commit wait timing out
/// all demand the same remedial action from the caller (retry, possibly against a
/// different replica), and retry is always safe thanks to per-session deduplication,
/// so the distinction stays internal.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("this replica cannot currently serve the request; retry against the leader")]
    WrongLeader,
}

// ------- Conversions --------

impl From<WriteKind> for CommandKind {
    fn from(kind: WriteKind) -> Self {
        match kind {
            WriteKind::Put => CommandKind::Put,
            WriteKind::Append => CommandKind::Append,
        }
    }
}
