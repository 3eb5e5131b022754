//! Errors returned by backend drivers.
use thiserror::Error;

use crate::core::error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The queried user is not in the backend.
    #[error("user does not exist")]
    UserNotFound,

    /// The queried torrent is not in the backend.
    #[error("torrent does not exist")]
    TorrentNotFound,

    /// The configuration names a driver this build does not provide.
    #[error("unknown backend driver: {name}")]
    UnknownDriver { name: String },

    /// The driver could not reach or operate its storage.
    #[error("backend driver failure: {message}")]
    DriverFailure { message: String },
}

impl From<Error> for error::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::UserNotFound => error::Error::UserNotFound,
            Error::TorrentNotFound => error::Error::TorrentNotFound,
            Error::UnknownDriver { .. } | Error::DriverFailure { .. } => error::Error::Internal,
        }
    }
}
