//! Error taxonomy for command execution.
//!
//! Every error carries a classification ([`ErrorKind`]) so retry policies
//! can match on categories instead of concrete error identities.

use serde::{Deserialize, Serialize};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification tag carried by every error value.
///
/// Retry policies declare eligibility as a set of kinds; see
/// [`crate::RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or empty command input. Never retried.
    Validation,
    /// Connection-level failure (pool closed, I/O, TLS).
    Connection,
    /// The driver timed out waiting for a connection or a statement.
    Timeout,
    /// The database rejected or failed the statement.
    Database,
    /// The command executed but affected nothing it was expected to.
    NotFound,
    /// Transaction commit failure. Never retried.
    Commit,
    /// Anything the driver could not classify further.
    Internal,
}

/// Failure reported by a [`crate::Driver`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Create a driver error without an underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a driver error wrapping an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Every error raised while executing a sequence of retried attempts.
#[derive(Debug, Default)]
pub struct AttemptErrors(pub Vec<Error>);

impl std::fmt::Display for AttemptErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "one or more errors occurred: {joined}")
    }
}

impl std::error::Error for AttemptErrors {}

/// Errors that can occur while building or executing commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command failed synchronous validation before any I/O happened.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Driver selection or connection configuration failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The data-access layer failed while executing a statement.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Transaction commit failed; the batch was rolled back instead.
    #[error("commit failed: {0}")]
    Commit(#[source] DriverError),

    /// An object command executed without effect and without a driver error.
    #[error("data was not found")]
    DataNotFound,

    /// The retry limit was reached before an attempt completed.
    #[error("retry limit reached")]
    RetryLimitReached(#[source] Box<Error>),

    /// Aggregate of every error raised across retry attempts.
    #[error(transparent)]
    Attempts(#[from] AttemptErrors),

    /// Flattened composite of the failures inside a merged result.
    #[error("{0}")]
    Merged(String),

    /// Invariant violation inside the engine itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classification of this error, used for retry eligibility.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCommand(_) => ErrorKind::Validation,
            Self::Driver(e) => e.kind(),
            Self::Commit(_) => ErrorKind::Commit,
            Self::DataNotFound => ErrorKind::NotFound,
            Self::Config(_) | Self::RetryLimitReached(_) | Self::Attempts(_) | Self::Merged(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Collect the message of an error and of every cause beneath it.
///
/// The returned list starts with the error's own message and walks the
/// `source()` chain to the innermost cause.
pub fn message_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = Some(error);
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_chain_walks_sources() {
        let driver = DriverError::with_source(
            ErrorKind::Database,
            "statement failed",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        );
        let error = Error::Driver(driver);

        let messages = message_chain(&error);
        assert_eq!(messages, vec!["statement failed", "pipe closed"]);
    }

    #[test]
    fn commit_errors_classify_as_commit() {
        let error = Error::Commit(DriverError::new(ErrorKind::Database, "disk full"));
        assert_eq!(error.kind(), ErrorKind::Commit);
        assert_eq!(error.to_string(), "commit failed: disk full");
    }

    #[test]
    fn attempt_errors_join_messages() {
        let errors = AttemptErrors(vec![
            Error::DataNotFound,
            Error::InvalidCommand("empty".into()),
        ]);
        assert_eq!(
            errors.to_string(),
            "one or more errors occurred: data was not found; invalid command: empty"
        );
    }
}
