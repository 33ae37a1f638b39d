use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// SessionId is an opaque client identity, stable for the client's lifetime. It scopes
/// request-id based deduplication.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RequestId is assigned by the client, monotonically increasing within a session.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        RequestId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum CommandKind {
    Get,
    Put,
    Append,
}

/// Command is the unit submitted to the replicated log. The request coordinator
/// decides whether *its* submission committed at an index by comparing the committed
/// command against the submitted one by full value equality, so every field
/// participates in `PartialEq`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Command {
    pub(crate) kind: CommandKind,
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) session_id: SessionId,
    pub(crate) request_id: RequestId,
}

impl Command {
    pub(crate) fn get(key: String, session_id: SessionId, request_id: RequestId) -> Self {
        Command {
            kind: CommandKind::Get,
            key,
            value: String::new(),
            session_id,
            request_id,
        }
    }

    pub(crate) fn write(
        kind: CommandKind,
        key: String,
        value: String,
        session_id: SessionId,
        request_id: RequestId,
    ) -> Self {
        Command {
            kind,
            key,
            value,
            session_id,
            request_id,
        }
    }

    /// encode the command in the following way:
    /// | 1 byte | 8 bytes    | 8 bytes    | 4 bytes | var length | var length |
    /// |  kind  | session id | request id | key len |    key     |   value    |
    pub(crate) fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(HEADER_LEN + self.key.len() + self.value.len());
        bytes.put_u8(match self.kind {
            CommandKind::Get => 0,
            CommandKind::Put => 1,
            CommandKind::Append => 2,
        });
        bytes.put_u64(self.session_id.as_u64());
        bytes.put_u64(self.request_id.as_u64());
        bytes.put_u32(self.key.len() as u32);
        bytes.put_slice(self.key.as_bytes());
        bytes.put_slice(self.value.as_bytes());

        bytes.freeze()
    }

    pub(crate) fn decode(mut bytes: Bytes) -> Result<Self, CommandDecodeError> {
        if bytes.remaining() < HEADER_LEN {
            return Err(CommandDecodeError::Truncated);
        }

        let kind = match bytes.get_u8() {
            0 => CommandKind::Get,
            1 => CommandKind::Put,
            2 => CommandKind::Append,
            other => return Err(CommandDecodeError::UnknownKind(other)),
        };
        let session_id = SessionId::new(bytes.get_u64());
        let request_id = RequestId::new(bytes.get_u64());

        let key_len = bytes.get_u32() as usize;
        if bytes.remaining() < key_len {
            return Err(CommandDecodeError::Truncated);
        }
        let key_bytes = bytes.split_to(key_len);
        let key = String::from_utf8(key_bytes.to_vec()).map_err(|_| CommandDecodeError::MalformedString)?;
        let value = String::from_utf8(bytes.to_vec()).map_err(|_| CommandDecodeError::MalformedString)?;

        Ok(Command {
            kind,
            key,
            value,
            session_id,
            request_id,
        })
    }
}

const HEADER_LEN: usize = 1 + 8 + 8 + 4;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CommandDecodeError {
    #[error("command entry is truncated")]
    Truncated,
    #[error("unknown command kind: {0}")]
    UnknownKind(u8),
    #[error("command key/value is not valid UTF-8")]
    MalformedString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let command = Command::write(
            CommandKind::Append,
            "some-key".into(),
            "some-value".into(),
            SessionId::new(77),
            RequestId::new(3),
        );

        let decoded = Command::decode(command.encode()).unwrap();

        assert_eq!(decoded, command);
    }

    #[test]
    fn encode_decode_get_with_empty_value() {
        let command = Command::get("k".into(), SessionId::new(1), RequestId::new(1));

        let decoded = Command::decode(command.encode()).unwrap();

        assert_eq!(decoded, command);
        assert_eq!(decoded.value, "");
    }

    #[test]
    fn decode_truncated_entry() {
        let command = Command::get("some-key".into(), SessionId::new(1), RequestId::new(1));
        let encoded = command.encode();

        // Cut the payload mid-key.
        let truncated = encoded.slice(0..encoded.len() - 3);

        assert!(matches!(
            Command::decode(truncated),
            Err(CommandDecodeError::Truncated)
        ));
    }

    #[test]
    fn decode_unknown_kind() {
        let command = Command::get("k".into(), SessionId::new(1), RequestId::new(1));
        let mut encoded = BytesMut::from(command.encode().as_ref());
        encoded[0] = 9;

        assert!(matches!(
            Command::decode(encoded.freeze()),
            Err(CommandDecodeError::UnknownKind(9))
        ));
    }
}
