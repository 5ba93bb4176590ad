use std::sync::Arc;

use crate::backoff::{LinearBackoff, RetryPolicy};
use crate::monitor::ConnectionMonitor;
use crate::transport::{Connector, TcpConnector};
use crate::{Connection, ConnectionConfig};

/// Builds supervised connections.
///
/// `build` wires the collaborators together: the [`Connector`] makes the
/// transport, the [`RetryPolicy`] (default: [`LinearBackoff`] bound to the
/// config) decides reconnection, and a [`ConnectionMonitor`] observes the
/// result. Construction never blocks and never fails synchronously — the
/// first connect happens on the driver task and failures surface as
/// events and retry decisions.
pub struct ConnectionBuilder {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn RetryPolicy>,
    diagnostics: bool,
}

impl ConnectionBuilder {
    pub fn new(config: ConnectionConfig) -> Self {
        let policy = Arc::new(LinearBackoff::from_config(&config));
        Self {
            config,
            connector: Arc::new(TcpConnector),
            policy,
            diagnostics: false,
        }
    }

    /// Replaces the transport factory. This is the seam for real store
    /// client libraries and for tests.
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Replaces the retry policy.
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Enables verbose lifecycle logging on the attached monitor. See
    /// [`diagnostics_from_env`](crate::diagnostics_from_env).
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Builds a connection and starts its driver.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(&self) -> Connection {
        let transport = self.connector.transport(&self.config);
        let connection = Connection::spawn(self.config.clone(), transport, self.policy.clone());
        ConnectionMonitor::new(self.diagnostics).attach(&connection);
        connection
    }
}
