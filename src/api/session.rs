use crate::server::{RequestId, SessionId};
use rand::Rng;

/// ClientSession stamps outgoing requests with the identity the server's
/// deduplication layer keys on: a session id stable for the client's lifetime and a
/// request id that increases by one per logical request.
///
/// Retries of the same logical request must reuse the request id it was originally
/// stamped with; that is what makes blind retry after `WrongLeader` safe.
pub struct ClientSession {
    session_id: SessionId,
    next_request_id: u64,
}

impl ClientSession {
    /// Allocate a fresh random session id.
    pub fn generate() -> Self {
        Self::with_id(SessionId::new(rand::thread_rng().gen()))
    }

    pub fn with_id(session_id: SessionId) -> Self {
        ClientSession {
            session_id,
            next_request_id: 1,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The id to stamp on the next NEW logical request.
    pub fn next_request_id(&mut self) -> RequestId {
        let request_id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;

        request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_start_at_one_and_increase() {
        let mut session = ClientSession::with_id(SessionId::new(42));

        assert_eq!(session.next_request_id(), RequestId::new(1));
        assert_eq!(session.next_request_id(), RequestId::new(2));
        assert_eq!(session.session_id(), SessionId::new(42));
    }
}
