use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QmpError>;

/// Failures talking to a QMP control socket.
#[derive(Debug, Error)]
pub enum QmpError {
    /// The socket path is missing or nothing is accepting connections on it.
    #[error("connect to QMP socket {}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The connection broke while reading or writing.
    #[error("QMP connection error")]
    Io(#[source] io::Error),

    /// A command could not be encoded as JSON.
    #[error("encode QMP command `{execute}`")]
    Encode {
        execute: String,
        #[source]
        source: serde_json::Error,
    },

    /// A socket timeout configured by the caller expired.
    #[error("timed out waiting on QMP socket")]
    Timeout,
}

impl QmpError {
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => QmpError::Timeout,
            _ => QmpError::Io(err),
        }
    }
}
