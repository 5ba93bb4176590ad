use std::io;

/// Error type returned by this crate.
///
/// The type is `Clone` so failures can travel through the event and state
/// channels to every observer of a shared connection. I/O failures are
/// captured as kind + code + message rather than wrapping
/// [`std::io::Error`], which is not cloneable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KvLinkError {
    /// Socket-level failure while connecting or during a live session.
    #[error("i/o error: {message}")]
    Io {
        /// Classified error kind reported by the operating system.
        kind: io::ErrorKind,
        /// Raw OS error code, when the failure came from a syscall.
        code: Option<i32>,
        /// Human-readable description.
        message: String,
    },
    /// Invalid configuration value or environment variable.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The store rejected the session credentials.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The store violated the session protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Reconnection was abandoned with an explicit reason.
    #[error("{0}")]
    Aborted(String),
    /// The connection ended without a session error.
    #[error("connection closed")]
    Closed,
}

impl From<io::Error> for KvLinkError {
    fn from(error: io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            code: error.raw_os_error(),
            message: error.to_string(),
        }
    }
}

impl KvLinkError {
    /// Whether this is the transient "connection refused" failure that the
    /// retry policy keeps retrying. Every other error ends reconnection.
    pub fn is_connection_refused(&self) -> bool {
        matches!(
            self,
            Self::Io {
                kind: io::ErrorKind::ConnectionRefused,
                ..
            }
        )
    }

    /// Raw OS error code, when one exists.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Io { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::KvLinkError;

    #[test]
    fn refused_io_error_is_classified_as_refused() {
        let error = KvLinkError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(error.is_connection_refused());
    }

    #[test]
    fn other_errors_are_not_refused() {
        let reset = KvLinkError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(!reset.is_connection_refused());
        assert!(!KvLinkError::Auth("denied".to_owned()).is_connection_refused());
        assert!(!KvLinkError::Closed.is_connection_refused());
    }

    #[test]
    fn os_error_code_is_preserved() {
        let error = KvLinkError::from(io::Error::from_raw_os_error(111));
        assert_eq!(error.code(), Some(111));
        assert_eq!(KvLinkError::Closed.code(), None);
    }
}
