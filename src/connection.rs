use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::backoff::{FailureContext, RetryDecision, RetryPolicy};
use crate::transport::Transport;
use crate::{ConnectionConfig, ConnectionEvent, ConnectionState, KvLinkError, Result};

/// Capacity of the lifecycle event channel. An observer that falls further
/// behind than this misses events (broadcast lag) but keeps receiving.
const EVENT_CHANNEL_CAPACITY: usize = 64;

struct Inner {
    config: ConnectionConfig,
    events: broadcast::Sender<ConnectionEvent>,
    state: watch::Receiver<ConnectionState>,
    shutdown: mpsc::Sender<()>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a supervised store connection.
///
/// Cloning is cheap and every clone refers to the same underlying
/// connection. The driver task runs until the retry policy gives up, the
/// handle is [`close`](Connection::close)d, or the last clone is dropped;
/// a factory-owned handle therefore lives for the rest of the process.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Spawns the driver task and wraps it in a handle. Must be called
    /// from within a Tokio runtime.
    pub(crate) fn spawn(
        config: ConnectionConfig,
        transport: Box<dyn Transport>,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let driver = tokio::spawn(drive(
            transport,
            policy,
            events_tx.clone(),
            state_tx,
            shutdown_rx,
        ));
        Self {
            inner: Arc::new(Inner {
                config,
                events: events_tx,
                state: state_rx,
                shutdown: shutdown_tx,
                driver: Mutex::new(Some(driver)),
            }),
        }
    }

    /// The configuration this connection was built from.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Waits until a session is established.
    ///
    /// Returns the terminal failure if reconnection was abandoned, or
    /// [`KvLinkError::Closed`] if the connection was closed before a
    /// session came up.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut state = self.inner.state.clone();
        loop {
            match &*state.borrow_and_update() {
                ConnectionState::Ready => return Ok(()),
                ConnectionState::Failed(error) => return Err(error.clone()),
                ConnectionState::Ended => return Err(KvLinkError::Closed),
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            }
            if state.changed().await.is_err() {
                return Err(KvLinkError::Closed);
            }
        }
    }

    /// Whether `other` is a handle to the same underlying connection.
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Signals the driver to disconnect and waits for it to finish.
    ///
    /// Idempotent; later calls return immediately. Afterwards the state is
    /// [`ConnectionState::Ended`] unless the connection had already failed.
    pub async fn close(&self) {
        let _ = self.inner.shutdown.send(()).await;
        let driver = self.inner.driver.lock().await.take();
        if let Some(driver) = driver {
            let _ = driver.await;
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish()
    }
}

/// What the driver does next.
enum Phase {
    /// Try to establish a session right away.
    Connect,
    /// Ask the retry policy about a failure before anything else.
    Decide(Option<KvLinkError>),
}

/// Owns the reconnect loop: issues connection attempts, publishes lifecycle
/// events and state, and acts on retry decisions. The policy and the
/// monitor only observe; this task is the sole agent that initiates
/// connection attempts.
async fn drive(
    mut transport: Box<dyn Transport>,
    policy: Arc<dyn RetryPolicy>,
    events: broadcast::Sender<ConnectionEvent>,
    state: watch::Sender<ConnectionState>,
    mut shutdown: mpsc::Receiver<()>,
) {
    let _ = events.send(ConnectionEvent::Connecting);

    // Attempt number and elapsed clock are scoped to one reconnection
    // episode and reset every time a session is established.
    let mut episode_started = Instant::now();
    let mut attempt: u32 = 0;
    let mut phase = Phase::Connect;

    loop {
        match phase {
            Phase::Connect => {
                let connected = tokio::select! {
                    _ = shutdown.recv() => {
                        finish(&events, &state, ConnectionState::Ended);
                        return;
                    }
                    result = transport.connect() => result,
                };
                match connected {
                    Ok(()) => {
                        let _ = state.send(ConnectionState::Ready);
                        let _ = events.send(ConnectionEvent::Ready);
                        let ended = tokio::select! {
                            _ = shutdown.recv() => None,
                            result = transport.session() => Some(result),
                        };
                        let _ = events.send(ConnectionEvent::Closed);
                        match ended {
                            // Explicit close, or the last handle dropped.
                            None => {
                                finish(&events, &state, ConnectionState::Ended);
                                return;
                            }
                            Some(result) => {
                                episode_started = Instant::now();
                                attempt = 0;
                                phase = Phase::Decide(result.err());
                            }
                        }
                    }
                    Err(error) => phase = Phase::Decide(Some(error)),
                }
            }
            Phase::Decide(failure) => {
                if let Some(error) = &failure {
                    let _ = events.send(ConnectionEvent::Error(error.clone()));
                }
                attempt += 1;
                let decision = policy.decide(&FailureContext {
                    error: failure.as_ref(),
                    attempt,
                    elapsed: episode_started.elapsed(),
                });
                match decision {
                    RetryDecision::Delay(delay) => {
                        let _ = state.send(ConnectionState::Reconnecting);
                        let _ = events.send(ConnectionEvent::Reconnecting { attempt, delay });
                        tokio::select! {
                            _ = shutdown.recv() => {
                                finish(&events, &state, ConnectionState::Ended);
                                return;
                            }
                            _ = sleep(delay) => {}
                        }
                        phase = Phase::Connect;
                    }
                    RetryDecision::Abort(reason) => {
                        let terminal = KvLinkError::Aborted(reason);
                        let _ = events.send(ConnectionEvent::Error(terminal.clone()));
                        finish(&events, &state, ConnectionState::Failed(terminal));
                        return;
                    }
                    RetryDecision::AbortSilent => {
                        let terminal = failure.unwrap_or(KvLinkError::Closed);
                        finish(&events, &state, ConnectionState::Failed(terminal));
                        return;
                    }
                }
            }
        }
    }
}

fn finish(
    events: &broadcast::Sender<ConnectionEvent>,
    state: &watch::Sender<ConnectionState>,
    terminal: ConnectionState,
) {
    let _ = state.send(terminal);
    let _ = events.send(ConnectionEvent::Ended);
}
