use std::time::Duration;

use crate::KvLinkError;

/// Lifecycle notification published by the connection driver.
///
/// Events are broadcast to every subscriber of a
/// [`Connection`](crate::Connection); the
/// [`ConnectionMonitor`](crate::ConnectionMonitor) forwards them to the
/// diagnostic sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The initial connection attempt started.
    Connecting,
    /// A session is established and the connection is usable.
    Ready,
    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// 1-based attempt number within the current episode.
        attempt: u32,
        /// Delay chosen by the retry policy before the attempt.
        delay: Duration,
    },
    /// The session or socket closed.
    Closed,
    /// The driver finished; no further events follow.
    Ended,
    /// A failure was observed. Always forwarded to the diagnostic sink,
    /// whether or not verbose diagnostics are enabled.
    Error(KvLinkError),
}

/// Coarse connection state, readable at any time via
/// [`Connection::state`](crate::Connection::state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Establishing the first session.
    Connecting,
    /// Session established.
    Ready,
    /// Session lost; retrying per policy.
    Reconnecting,
    /// Reconnection abandoned; the payload is the terminal failure.
    Failed(KvLinkError),
    /// Explicitly closed. Terminal.
    Ended,
}

impl ConnectionState {
    /// Whether a session is currently established.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the driver has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Ended)
    }
}
