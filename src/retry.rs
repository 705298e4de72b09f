//! Retry policy and the attempt-tracking session that applies it.

use std::collections::HashSet;
use std::time::Instant;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AttemptErrors, Error, ErrorKind, Result};
use crate::result::CommandResult;

/// Declarative description of how many attempts an execution gets and
/// which error classifications qualify for another one.
///
/// Policies are plain data and can be deserialized from configuration:
///
/// ```
/// let policy: dbatch::RetryPolicy =
///     serde_json::from_str(r#"{"max_attempts": 5, "retry_on": ["timeout", "connection"]}"#)
///         .unwrap();
/// assert_eq!(policy.max_attempts(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_on: HashSet<ErrorKind>,
    #[serde(rename = "retry_on_any")]
    any: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_on: HashSet::new(),
            any: false,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and no retryable kinds yet.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy substituted when an execution carries none: one attempt,
    /// any execution error eligible.
    pub fn fallback() -> Self {
        Self::new(1).retry_on_any()
    }

    /// Mark one error classification as retryable.
    pub fn retry_on(mut self, kind: ErrorKind) -> Self {
        self.retry_on.insert(kind);
        self
    }

    /// Mark every execution error as retryable. Validation and commit
    /// failures stay terminal regardless.
    pub fn retry_on_any(mut self) -> Self {
        self.any = true;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether this policy grants another attempt after `error`.
    pub fn is_retryable(&self, error: &Error) -> bool {
        match error.kind() {
            ErrorKind::Validation | ErrorKind::Commit => false,
            kind => self.any || self.retry_on.contains(&kind),
        }
    }
}

/// Tracks one retried execution: attempt budget, raised errors, and the
/// final result shaping.
///
/// The session never sees the operation itself; the caller loops while
/// [`wants_attempt`](Self::wants_attempt) holds, feeding each outcome to
/// [`record`](Self::record), and closes with [`finish`](Self::finish):
///
/// ```no_run
/// use dbatch::{CommandResult, RetryPolicy, RetrySession};
///
/// # fn attempt() -> dbatch::Result<CommandResult> { Ok(CommandResult::new(1, true)) }
/// # fn demo() -> dbatch::Result<CommandResult> {
/// let mut session = RetrySession::new(Some(RetryPolicy::new(3).retry_on_any()));
/// while session.wants_attempt() {
///     session.record(attempt());
/// }
/// session.finish(false)
/// # }
/// ```
#[derive(Debug)]
pub struct RetrySession {
    policy: RetryPolicy,
    attempts_left: u32,
    executed: bool,
    errors: Vec<Error>,
    result: Option<CommandResult>,
    started: Instant,
}

impl RetrySession {
    /// Start a session. A missing policy, or one with a zero attempt
    /// budget, is replaced by [`RetryPolicy::fallback`].
    pub fn new(policy: Option<RetryPolicy>) -> Self {
        let policy = policy
            .filter(|p| p.max_attempts >= 1)
            .unwrap_or_else(RetryPolicy::fallback);
        Self {
            attempts_left: policy.max_attempts,
            policy,
            executed: false,
            errors: Vec::new(),
            result: None,
            started: Instant::now(),
        }
    }

    /// True while another attempt should be made.
    pub fn wants_attempt(&self) -> bool {
        !self.executed && self.attempts_left > 0
    }

    /// Feed the outcome of one attempt.
    ///
    /// A returned result ends the session. A raised error ends it too
    /// unless the policy classifies it as retryable, in which case one
    /// attempt is consumed. Every raised error is kept for aggregation.
    pub fn record(&mut self, outcome: Result<CommandResult>) {
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.executed = true;
            }
            Err(error) => {
                if self.policy.is_retryable(&error) {
                    self.attempts_left -= 1;
                    debug!(attempts_left = self.attempts_left, error = %error, "retrying after retryable error");
                } else {
                    self.executed = true;
                }
                self.errors.push(error);
            }
        }
    }

    /// Close the session and shape the final result.
    ///
    /// Without a returned result the outcome is a failure aggregating every
    /// raised error. An exhausted attempt budget forces the failure shape
    /// and wraps whatever error was present in a retry-limit error. With
    /// `throw_on_failure`, an unsuccessful outcome that carries an error is
    /// raised instead of returned.
    pub fn finish(mut self, throw_on_failure: bool) -> Result<CommandResult> {
        let exhausted = self.attempts_left == 0;
        let mut result = match self.result.take() {
            Some(result) => result,
            None => CommandResult::failed(Error::Attempts(AttemptErrors(std::mem::take(
                &mut self.errors,
            )))),
        };

        if exhausted {
            let prior = result
                .error
                .take()
                .unwrap_or_else(|| Error::Internal("no execution error was recorded".into()));
            result.rows_affected = -1;
            result.success = false;
            result.error = Some(Error::RetryLimitReached(Box::new(prior)));
        }

        result.elapsed = self.started.elapsed();

        if throw_on_failure && !result.success {
            if let Some(error) = result.error.take() {
                return Err(error);
            }
        }
        Ok(result)
    }
}
