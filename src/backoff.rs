//! Retry decisions for lost store connections.
//!
//! When a connection attempt fails or a live session drops, the driver asks
//! a [`RetryPolicy`] what to do next. The bundled [`LinearBackoff`] grows
//! the delay linearly with the attempt number and clamps it to a floor —
//! not the exponential strategy most clients ship.

use std::time::Duration;

use crate::{ConnectionConfig, KvLinkError};

/// Failure context handed to a [`RetryPolicy`] for each failed attempt.
///
/// A fresh value is built per failure event and discarded once the decision
/// is made. `attempt` and `elapsed` are scoped to one reconnection episode
/// and reset every time a session is established.
#[derive(Clone, Copy, Debug)]
pub struct FailureContext<'a> {
    /// The failure that triggered this decision. `None` when the previous
    /// session ended without an error (clean server close).
    pub error: Option<&'a KvLinkError>,
    /// 1-based attempt number, monotonically increasing within the episode.
    pub attempt: u32,
    /// Cumulative retry time since the episode began.
    pub elapsed: Duration,
}

/// Outcome of a retry decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting this long.
    Delay(Duration),
    /// Stop retrying and surface the given reason as the terminal error.
    Abort(String),
    /// Stop retrying; the pending failure itself becomes the terminal error.
    AbortSilent,
}

/// Decides whether a lost connection is retried and how long to wait.
///
/// Implementations must be non-blocking and free of side effects beyond
/// diagnostics; the driver alone acts on the returned decision and issues
/// connection attempts.
pub trait RetryPolicy: Send + Sync {
    fn decide(&self, ctx: &FailureContext<'_>) -> RetryDecision;
}

/// Linear backoff with a floor, bounded by attempt count and total retry
/// time.
///
/// This is the default policy installed by
/// [`ConnectionBuilder`](crate::ConnectionBuilder), bound to the
/// reconnection knobs of a [`ConnectionConfig`].
#[derive(Clone, Debug)]
pub struct LinearBackoff {
    max_retry_attempts: u32,
    max_retry_time: Duration,
    backoff_factor_ms: u64,
    backoff_minimum_ms: u64,
}

impl LinearBackoff {
    /// Binds the policy to the reconnection knobs of `config`.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            max_retry_time: Duration::from_millis(config.max_retry_time_ms),
            backoff_factor_ms: config.backoff_factor_ms,
            backoff_minimum_ms: config.backoff_minimum_ms,
        }
    }
}

impl RetryPolicy for LinearBackoff {
    fn decide(&self, ctx: &FailureContext<'_>) -> RetryDecision {
        // Anything other than "connection refused" is assumed non-transient
        // (auth failure, protocol error) and ends reconnection; the failure
        // is surfaced to callers as the terminal error.
        if let Some(error) = ctx.error {
            if !error.is_connection_refused() {
                tracing::debug!("retry strategy: none, an error occurred");
                return RetryDecision::AbortSilent;
            }
        }

        if ctx.elapsed > self.max_retry_time {
            tracing::debug!("retry strategy: none, exhausted retry time");
            return RetryDecision::Abort("retry time exhausted".to_owned());
        }

        if ctx.attempt > self.max_retry_attempts {
            tracing::debug!("retry strategy: none, exhausted retry attempts");
            return RetryDecision::AbortSilent;
        }

        let delay_ms = u64::from(ctx.attempt)
            .saturating_mul(self.backoff_factor_ms)
            .max(self.backoff_minimum_ms);
        tracing::debug!("retry strategy: try to reconnect {delay_ms} ms from now");
        RetryDecision::Delay(Duration::from_millis(delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use super::{FailureContext, LinearBackoff, RetryDecision, RetryPolicy};
    use crate::{ConnectionConfig, KvLinkError};

    fn policy(attempts: u32, time_ms: u64, factor_ms: u64, minimum_ms: u64) -> LinearBackoff {
        LinearBackoff::from_config(&ConnectionConfig {
            max_retry_attempts: attempts,
            max_retry_time_ms: time_ms,
            backoff_factor_ms: factor_ms,
            backoff_minimum_ms: minimum_ms,
            ..ConnectionConfig::default()
        })
    }

    fn refused() -> KvLinkError {
        KvLinkError::from(io::Error::from(io::ErrorKind::ConnectionRefused))
    }

    fn ctx(error: Option<&KvLinkError>, attempt: u32, elapsed_ms: u64) -> FailureContext<'_> {
        FailureContext {
            error,
            attempt,
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    #[test]
    fn non_refused_errors_end_reconnection_silently() {
        let policy = policy(5, 5_000, 100, 200);
        let auth = KvLinkError::Auth("invalid password".to_owned());
        let reset = KvLinkError::from(io::Error::from(io::ErrorKind::ConnectionReset));

        // Regardless of attempt number or elapsed time.
        for (attempt, elapsed_ms) in [(1, 0), (3, 1_000), (100, 100_000)] {
            for error in [&auth, &reset] {
                assert_eq!(
                    policy.decide(&ctx(Some(error), attempt, elapsed_ms)),
                    RetryDecision::AbortSilent
                );
            }
        }
    }

    #[test]
    fn exhausted_retry_time_aborts_with_reason() {
        let policy = policy(5, 5_000, 100, 200);
        let error = refused();
        assert_eq!(
            policy.decide(&ctx(Some(&error), 1, 5_001)),
            RetryDecision::Abort("retry time exhausted".to_owned())
        );
    }

    #[test]
    fn elapsed_time_at_ceiling_still_retries() {
        let policy = policy(5, 5_000, 100, 200);
        let error = refused();
        assert!(matches!(
            policy.decide(&ctx(Some(&error), 1, 5_000)),
            RetryDecision::Delay(_)
        ));
    }

    #[test]
    fn exhausted_attempts_abort_silently() {
        let policy = policy(5, 5_000, 100, 200);
        let error = refused();
        assert_eq!(
            policy.decide(&ctx(Some(&error), 6, 1_000)),
            RetryDecision::AbortSilent
        );
        // The attempt ceiling itself is still within budget.
        assert!(matches!(
            policy.decide(&ctx(Some(&error), 5, 1_000)),
            RetryDecision::Delay(_)
        ));
    }

    #[test]
    fn delay_grows_linearly_and_is_clamped_to_the_floor() {
        let policy = policy(100, 600_000, 50, 200);
        let error = refused();
        assert_eq!(
            policy.decide(&ctx(Some(&error), 1, 0)),
            RetryDecision::Delay(Duration::from_millis(200))
        );
        assert_eq!(
            policy.decide(&ctx(Some(&error), 10, 0)),
            RetryDecision::Delay(Duration::from_millis(500))
        );
    }

    #[test]
    fn clean_session_close_is_retried() {
        let policy = policy(5, 5_000, 100, 200);
        assert_eq!(
            policy.decide(&ctx(None, 1, 0)),
            RetryDecision::Delay(Duration::from_millis(200))
        );
    }

    #[test]
    fn refused_failure_sequence_produces_expected_delays() {
        // Three consecutive refused failures observed at 0, 150 and 400 ms
        // into the episode.
        let policy = policy(5, 5_000, 100, 200);
        let error = refused();
        let observed: Vec<RetryDecision> = [(1, 0), (2, 150), (3, 400)]
            .into_iter()
            .map(|(attempt, elapsed_ms)| policy.decide(&ctx(Some(&error), attempt, elapsed_ms)))
            .collect();
        assert_eq!(
            observed,
            vec![
                RetryDecision::Delay(Duration::from_millis(200)),
                RetryDecision::Delay(Duration::from_millis(200)),
                RetryDecision::Delay(Duration::from_millis(300)),
            ]
        );
    }
}
