//! Bounded retry with a fixed pause between attempts.
//!
//! The combinator knows nothing about HTTP; it drives any fallible async
//! operation so the attempt count and spacing can be tested with stubs and
//! a paused tokio clock.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Attempts actually made; zero is treated as a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryExhausted<E> {}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// `op` receives the zero-based attempt number. The pause is taken between
/// attempts only, never after the last one.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> std::result::Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "Attempt failed");
                if attempt + 1 >= attempts {
                    return Err(RetryExhausted {
                        attempts,
                        last_error: e,
                    });
                }
                debug!(delay_secs = policy.delay.as_secs_f64(), "Retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Outcome of one logical query after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Trimmed model text
    Answered(String),
    /// Every attempt failed; `reason` describes the last failure
    Failed { attempts: u32, reason: String },
}

impl QueryOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Value stored in `chat_responses`.
    ///
    /// Failures are written as `Error: <reason>` so the document keeps one
    /// slot per repetition; readers tell them apart only by that prefix.
    pub fn into_response(self) -> String {
        match self {
            Self::Answered(text) => text,
            Self::Failed { reason, .. } => format!("Error: {reason}"),
        }
    }
}

impl<E: fmt::Display> From<std::result::Result<String, RetryExhausted<E>>> for QueryOutcome {
    fn from(result: std::result::Result<String, RetryExhausted<E>>) -> Self {
        match result {
            Ok(text) => Self::Answered(text),
            Err(exhausted) => Self::Failed {
                attempts: exhausted.attempts,
                reason: exhausted.last_error.to_string(),
            },
        }
    }
}
