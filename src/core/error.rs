//! Errors returned by the core tracker.
//!
//! Only the first five kinds may reach a client as a `failure reason`; the
//! rest are collapsed to a generic message at the delivery edge. The `Display`
//! strings of the public kinds are the exact wire messages.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A request missing or carrying an unparseable required field.
    #[error("malformed request")]
    MalformedRequest,

    /// A request that is structurally valid but impossible in the peer's
    /// current state, e.g. `stopped` from an unknown peer in private mode.
    #[error("bad request")]
    BadRequest,

    /// The passkey does not resolve to a registered user.
    #[error("user does not exist")]
    UserNotFound,

    /// The infohash does not resolve to a swarm and on-announce creation is
    /// disabled.
    #[error("torrent does not exist")]
    TorrentNotFound,

    /// The peer-id prefix is not in the client whitelist.
    #[error("client is not approved")]
    ClientUnapproved,

    /// The passkey is not a well-formed 48-char base32-lowercase value.
    #[error("passkey is invalid")]
    InvalidPasskey,

    /// A transient failure, e.g. the random source refusing to produce a
    /// collision-free passkey within the retry budget.
    #[error("temporary failure, retry later")]
    Retryable,

    /// An invariant violation inside the tracker.
    #[error("internal server error")]
    Internal,
}

impl Error {
    /// Whether the error message may be propagated to the client verbatim.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Error::MalformedRequest
                | Error::BadRequest
                | Error::UserNotFound
                | Error::TorrentNotFound
                | Error::ClientUnapproved
                | Error::InvalidPasskey
        )
    }

    /// Whether the error is a not-found kind, used by the admin API to map to
    /// a `404` status.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UserNotFound | Error::TorrentNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn it_should_expose_the_exact_wire_messages_for_public_errors() {
        assert_eq!(Error::MalformedRequest.to_string(), "malformed request");
        assert_eq!(Error::BadRequest.to_string(), "bad request");
        assert_eq!(Error::UserNotFound.to_string(), "user does not exist");
        assert_eq!(Error::TorrentNotFound.to_string(), "torrent does not exist");
        assert_eq!(Error::ClientUnapproved.to_string(), "client is not approved");
        assert_eq!(Error::InvalidPasskey.to_string(), "passkey is invalid");
    }

    #[test]
    fn it_should_keep_internal_errors_private() {
        assert!(!Error::Internal.is_public());
        assert!(!Error::Retryable.is_public());
    }

    #[test]
    fn it_should_classify_not_found_errors() {
        assert!(Error::UserNotFound.is_not_found());
        assert!(Error::TorrentNotFound.is_not_found());
        assert!(!Error::BadRequest.is_not_found());
    }
}
