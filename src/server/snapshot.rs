use crate::server::command::{RequestId, SessionId};
use crate::server::session::SessionTracker;
use crate::server::store::KeyValueStore;
use bytes::{Buf, BufMut, Bytes, BytesMut};

// A snapshot captures exactly the state the apply loop derives from the log: the
// key-value data and the per-session dedup high-water marks. Restoring both together
// is what keeps exactly-once semantics intact across log compaction: replaying a
// request that was applied before the snapshot must still be recognized as a
// duplicate afterwards.

/// serialize the store and session tracker in the following way:
/// | 4 bytes     | per key: 4B len, key, 4B len, value | 4 bytes       | per session: 8B id, 8B request |
/// | store count |                                     | session count |                                |
pub(crate) fn serialize(store: &KeyValueStore, sessions: &SessionTracker) -> Bytes {
    let mut bytes = BytesMut::new();

    let store_count = store.entries().count() as u32;
    bytes.put_u32(store_count);
    for (key, value) in store.entries() {
        bytes.put_u32(key.len() as u32);
        bytes.put_slice(key.as_bytes());
        bytes.put_u32(value.len() as u32);
        bytes.put_slice(value.as_bytes());
    }

    let session_count = sessions.entries().count() as u32;
    bytes.put_u32(session_count);
    for (session_id, request_id) in sessions.entries() {
        bytes.put_u64(session_id.as_u64());
        bytes.put_u64(request_id.as_u64());
    }

    bytes.freeze()
}

pub(crate) fn deserialize(mut bytes: Bytes) -> Result<(KeyValueStore, SessionTracker), SnapshotError> {
    let mut store = KeyValueStore::new();
    let store_count = read_u32(&mut bytes)?;
    for _ in 0..store_count {
        let key = read_string(&mut bytes)?;
        let value = read_string(&mut bytes)?;
        store.put(key, value);
    }

    let mut sessions = SessionTracker::new();
    let session_count = read_u32(&mut bytes)?;
    for _ in 0..session_count {
        if bytes.remaining() < 16 {
            return Err(SnapshotError::Truncated);
        }
        let session_id = SessionId::new(bytes.get_u64());
        let request_id = RequestId::new(bytes.get_u64());
        sessions.record(session_id, request_id);
    }

    Ok((store, sessions))
}

fn read_u32(bytes: &mut Bytes) -> Result<u32, SnapshotError> {
    if bytes.remaining() < 4 {
        return Err(SnapshotError::Truncated);
    }
    Ok(bytes.get_u32())
}

fn read_string(bytes: &mut Bytes) -> Result<String, SnapshotError> {
    let len = read_u32(bytes)? as usize;
    if bytes.remaining() < len {
        return Err(SnapshotError::Truncated);
    }
    let raw = bytes.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| SnapshotError::MalformedString)
}

// Snapshot payloads cross a process boundary (the consensus module ships them
// between replicas), so a bad payload is an ordinary error, not an invariant breach.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot payload is truncated")]
    Truncated,
    #[error("snapshot contains a string that is not valid UTF-8")]
    MalformedString,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_store_and_dedup_state() {
        let mut store = KeyValueStore::new();
        store.put("x".into(), "1".into());
        store.append("y".into(), "ab");
        let mut sessions = SessionTracker::new();
        sessions.record(SessionId::new(5), RequestId::new(9));

        let (restored_store, restored_sessions) = deserialize(serialize(&store, &sessions)).unwrap();

        assert_eq!(restored_store.get("x"), "1");
        assert_eq!(restored_store.get("y"), "ab");
        assert!(restored_sessions.is_duplicate(SessionId::new(5), RequestId::new(9)));
        assert!(!restored_sessions.is_duplicate(SessionId::new(5), RequestId::new(10)));
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let (store, sessions) = deserialize(serialize(&KeyValueStore::new(), &SessionTracker::new())).unwrap();

        assert_eq!(store.entries().count(), 0);
        assert_eq!(sessions.entries().count(), 0);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut store = KeyValueStore::new();
        store.put("some-key".into(), "some-value".into());
        let encoded = serialize(&store, &SessionTracker::new());

        let truncated = encoded.slice(0..encoded.len() - 5);

        assert!(matches!(deserialize(truncated), Err(SnapshotError::Truncated)));
    }
}
