//! Transport seam between the connection driver and the store client.
//!
//! The crate deliberately does not speak the store protocol. A
//! [`Transport`] wraps whatever client library does and reduces it to the
//! two things the driver cares about: establishing a session and noticing
//! its loss. The bundled [`TcpTransport`] only watches socket liveness.

use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::{ConnectionConfig, KvLinkError, Result};

/// A single reconnectable session with the store.
///
/// The driver calls [`connect`](Transport::connect) to establish a session
/// and then [`session`](Transport::session) to wait for its loss; after a
/// loss the same transport is asked to connect again.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Establishes a session with the store.
    async fn connect(&mut self) -> Result<()>;

    /// Waits until the established session is lost.
    ///
    /// Resolves with `Ok(())` when the server closed the session cleanly
    /// and with the causing error otherwise.
    async fn session(&mut self) -> Result<()>;
}

/// Makes a fresh [`Transport`] for a connection build.
pub trait Connector: Send + Sync {
    fn transport(&self, config: &ConnectionConfig) -> Box<dyn Transport>;
}

/// Default connector: plain TCP to the configured address.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn transport(&self, config: &ConnectionConfig) -> Box<dyn Transport> {
        Box::new(TcpTransport::new(&config.url))
    }
}

/// Minimal TCP transport: connects to the server and detects session loss
/// by watching the socket for EOF or errors.
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Accepts `host:port`, with an optional `scheme://` prefix which is
    /// ignored.
    pub fn new(url: &str) -> Self {
        Self {
            addr: strip_scheme(url).to_owned(),
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr).await?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn session(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| KvLinkError::Protocol("session polled before connect".to_owned()))?;
        let mut buf = [0u8; 512];
        loop {
            stream.readable().await?;
            match stream.try_read(&mut buf) {
                // EOF: the server closed the session.
                Ok(0) => {
                    self.stream = None;
                    return Ok(());
                }
                // Unsolicited bytes are not ours to interpret.
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
                Err(error) => {
                    self.stream = None;
                    return Err(error.into());
                }
            }
        }
    }
}

fn strip_scheme(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    }
}
