//! Data-access boundary.
//!
//! The engine talks to storage exclusively through [`Driver`]: statement
//! execution plus transaction control, keyed by opaque handles. Concrete
//! adapters translate onto `sqlx` pools; [`mock::MockDriver`] backs the
//! test suites.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::statement::Statement;

pub mod mock;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub(crate) mod sql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::MockDriver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opaque reference to a driver-owned transaction.
///
/// Minted by [`Driver::begin`]; valid until passed to `commit` or
/// `rollback` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(u64);

impl TransactionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Interface to the underlying data-access layer.
///
/// Implementations own connection lifecycle and placeholder dialect; the
/// engine only sequences calls. All mutable state behind a driver must be
/// safe to share, since one driver instance backs every batch created from
/// the same engine.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Cheap liveness check; must not block on a busy pool.
    async fn ensure_connection(&self) -> DriverResult<()>;

    /// Close the underlying connection pool.
    async fn close(&self) -> DriverResult<()>;

    /// Open a transaction and hand back its handle.
    async fn begin(&self) -> DriverResult<TransactionHandle>;

    /// Commit the transaction behind `transaction`, consuming it.
    async fn commit(&self, transaction: TransactionHandle) -> DriverResult<()>;

    /// Roll back the transaction behind `transaction`, consuming it.
    async fn rollback(&self, transaction: TransactionHandle) -> DriverResult<()>;

    /// Execute one statement, inside `transaction` when given, and report
    /// the affected-row count.
    async fn execute(
        &self,
        statement: &Statement,
        transaction: Option<TransactionHandle>,
    ) -> DriverResult<i64>;
}
