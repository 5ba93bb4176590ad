use tokio::sync::broadcast::error::RecvError;

use crate::{Connection, ConnectionEvent};

/// Observes a connection's lifecycle events and forwards them to the
/// diagnostic sink.
///
/// Lifecycle events are logged at DEBUG and only when diagnostics are
/// enabled; error events are logged at ERROR unconditionally — a failing
/// store connection is never silent. Attaching spawns a logging task that
/// owns nothing but an event receiver, so the monitor keeps no reference
/// to the handle and its task ends when the driver does.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionMonitor {
    diagnostics: bool,
}

impl ConnectionMonitor {
    pub fn new(diagnostics: bool) -> Self {
        Self { diagnostics }
    }

    /// Subscribes to `connection` and starts the logging task.
    pub fn attach(&self, connection: &Connection) {
        let mut events = connection.subscribe();
        let diagnostics = self.diagnostics;
        if diagnostics {
            tracing::debug!("client created for {}", connection.config().url);
        }
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => log_event(&event, diagnostics),
                    // Skipped events are diagnostics only; keep listening.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}

fn log_event(event: &ConnectionEvent, diagnostics: bool) {
    if let ConnectionEvent::Error(error) = event {
        tracing::error!("store connection error: {error}");
        return;
    }
    if !diagnostics {
        return;
    }
    match event {
        ConnectionEvent::Connecting => tracing::debug!("client connecting"),
        ConnectionEvent::Ready => tracing::debug!("client ready"),
        ConnectionEvent::Reconnecting { attempt, delay } => tracing::debug!(
            "client connection lost, reconnect attempt {} in {} ms",
            attempt,
            delay.as_millis()
        ),
        ConnectionEvent::Closed => tracing::debug!("client closed the connection"),
        ConnectionEvent::Ended => tracing::debug!("client ended"),
        ConnectionEvent::Error(_) => {}
    }
}
