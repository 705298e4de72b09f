//! PostgreSQL driver over a sqlx pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sea_query::PostgresQueryBuilder;
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::info;

use crate::driver::sql::driver_error;
use crate::driver::{Driver, DriverResult, TransactionHandle};
use crate::error::{DriverError, ErrorKind};
use crate::statement::Statement;

/// PostgreSQL implementation of the command driver.
pub struct PostgresDriver {
    pool: PgPool,
    transactions: Mutex<HashMap<u64, Transaction<'static, Postgres>>>,
    next_transaction: AtomicU64,
}

impl std::fmt::Debug for PostgresDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDriver")
            .field("next_transaction", &self.next_transaction)
            .finish_non_exhaustive()
    }
}

impl PostgresDriver {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            transactions: Mutex::new(HashMap::new()),
            next_transaction: AtomicU64::new(1),
        }
    }

    /// Connect to a PostgreSQL URL (e.g. `postgres://user@host/db`).
    pub async fn connect(url: &str) -> DriverResult<Self> {
        let pool = PgPool::connect(url).await.map_err(driver_error)?;
        info!(url, "postgres driver connected");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn build(statement: &Statement) -> (String, SqlxValues) {
        match statement {
            Statement::Raw { sql, values } => (sql.clone(), SqlxValues(values.clone())),
            Statement::Insert(stmt) => stmt.build_sqlx(PostgresQueryBuilder),
            Statement::Update(stmt) => stmt.build_sqlx(PostgresQueryBuilder),
            Statement::Delete(stmt) => stmt.build_sqlx(PostgresQueryBuilder),
        }
    }

    fn unknown_handle() -> DriverError {
        DriverError::new(ErrorKind::Internal, "unknown transaction handle")
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn ensure_connection(&self) -> DriverResult<()> {
        if self.pool.is_closed() {
            return Err(DriverError::new(
                ErrorKind::Connection,
                "connection pool is closed",
            ));
        }
        Ok(())
    }

    async fn close(&self) -> DriverResult<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn begin(&self) -> DriverResult<TransactionHandle> {
        let transaction = self.pool.begin().await.map_err(driver_error)?;
        let id = self.next_transaction.fetch_add(1, Ordering::Relaxed);
        self.transactions.lock().await.insert(id, transaction);
        Ok(TransactionHandle::new(id))
    }

    async fn commit(&self, transaction: TransactionHandle) -> DriverResult<()> {
        let tx = self
            .transactions
            .lock()
            .await
            .remove(&transaction.id())
            .ok_or_else(Self::unknown_handle)?;
        tx.commit().await.map_err(driver_error)
    }

    async fn rollback(&self, transaction: TransactionHandle) -> DriverResult<()> {
        let tx = self
            .transactions
            .lock()
            .await
            .remove(&transaction.id())
            .ok_or_else(Self::unknown_handle)?;
        tx.rollback().await.map_err(driver_error)
    }

    async fn execute(
        &self,
        statement: &Statement,
        transaction: Option<TransactionHandle>,
    ) -> DriverResult<i64> {
        let (sql, values) = Self::build(statement);
        let done = match transaction {
            Some(handle) => {
                let mut transactions = self.transactions.lock().await;
                let tx = transactions
                    .get_mut(&handle.id())
                    .ok_or_else(Self::unknown_handle)?;
                sqlx::query_with(&sql, values).execute(&mut **tx).await
            }
            None => sqlx::query_with(&sql, values).execute(&self.pool).await,
        };
        done.map(|done| done.rows_affected() as i64)
            .map_err(driver_error)
    }
}
