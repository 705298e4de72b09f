//! Shared helpers for the sqlx-backed drivers.

use crate::error::{DriverError, ErrorKind};

/// Map a sqlx failure onto the error classification retry policies match on.
pub(crate) fn classify(error: &sqlx::Error) -> ErrorKind {
    match error {
        sqlx::Error::PoolTimedOut => ErrorKind::Timeout,
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => ErrorKind::Connection,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(_) => ErrorKind::Database,
        _ => ErrorKind::Internal,
    }
}

pub(crate) fn driver_error(error: sqlx::Error) -> DriverError {
    DriverError::with_source(classify(&error), error.to_string(), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_the_common_failures() {
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), ErrorKind::Timeout);
        assert_eq!(classify(&sqlx::Error::PoolClosed), ErrorKind::Connection);
        assert_eq!(classify(&sqlx::Error::RowNotFound), ErrorKind::NotFound);
    }
}
