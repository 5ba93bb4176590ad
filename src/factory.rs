use std::sync::OnceLock;

use crate::{Connection, ConnectionBuilder, ConnectionConfig};

/// Hands out one shared connection per process, built lazily on first use.
///
/// The memoization slot is a [`OnceLock`]: under concurrent first calls
/// exactly one build happens and every caller observes the same handle.
/// The factory never replaces the handle — even while it is reconnecting
/// or after a terminal failure, [`get`](ConnectionFactory::get) keeps
/// returning the original connection for the rest of the process.
pub struct ConnectionFactory {
    builder: ConnectionBuilder,
    slot: OnceLock<Connection>,
}

impl ConnectionFactory {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_builder(ConnectionBuilder::new(config))
    }

    /// Uses a preconfigured builder (custom connector, policy or
    /// diagnostics).
    pub fn with_builder(builder: ConnectionBuilder) -> Self {
        Self {
            builder,
            slot: OnceLock::new(),
        }
    }

    /// Returns the shared connection, building it on the first call.
    ///
    /// Must be called from within a Tokio runtime (see
    /// [`ConnectionBuilder::build`]).
    pub fn get(&self) -> &Connection {
        self.slot.get_or_init(|| self.builder.build())
    }
}

/// Builds an independent, non-shared connection.
///
/// For callers that explicitly want their own connection next to the
/// factory-managed one.
pub fn new_connection(config: ConnectionConfig) -> Connection {
    ConnectionBuilder::new(config).build()
}
