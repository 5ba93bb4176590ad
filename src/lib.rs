//! `kvlink` supervises a single long-lived connection to a key-value
//! cache/store server.
//!
//! The crate does not speak the store protocol — it owns the connection
//! *lifecycle* around whatever client library does:
//! - [`ConnectionFactory`] builds one shared handle per process, lazily and
//!   exactly once, and keeps handing out that same handle.
//! - [`LinearBackoff`] decides after every failure whether to reconnect and
//!   how long to wait, with a linear, floor-clamped delay.
//! - [`ConnectionMonitor`] forwards lifecycle events to the diagnostic sink.
//!
//! ```no_run
//! use kvlink::{ConnectionConfig, ConnectionFactory};
//!
//! # async fn run() -> kvlink::Result<()> {
//! let config = ConnectionConfig::from_env()?;
//! let factory = ConnectionFactory::new(config);
//!
//! let connection = factory.get();
//! connection.wait_ready().await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod builder;
mod config;
mod connection;
mod error;
mod events;
mod factory;
mod monitor;
mod transport;

pub use backoff::{FailureContext, LinearBackoff, RetryDecision, RetryPolicy};
pub use builder::ConnectionBuilder;
pub use config::{diagnostics_from_env, ConnectionConfig};
pub use connection::Connection;
pub use error::KvLinkError;
pub use events::{ConnectionEvent, ConnectionState};
pub use factory::{new_connection, ConnectionFactory};
pub use monitor::ConnectionMonitor;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};

pub type Result<T> = std::result::Result<T, KvLinkError>;
