//! In-memory driver double with failure injection, for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sea_query::SqliteQueryBuilder;

use crate::driver::{Driver, DriverResult, TransactionHandle};
use crate::error::{DriverError, ErrorKind};
use crate::statement::Statement;

/// Record of one executed statement, for assertions.
#[derive(Debug, Clone)]
pub struct ExecutedStatement {
    pub sql: String,
    pub transaction: Option<TransactionHandle>,
}

/// Mock driver that records every call and can be told to fail.
///
/// Statements are rendered with the SQLite query builder so tests can
/// match on SQL fragments.
#[derive(Debug)]
pub struct MockDriver {
    executed: Mutex<Vec<ExecutedStatement>>,
    rows_by_fragment: Mutex<Vec<(String, i64)>>,
    default_rows: AtomicI64,
    fail_remaining: AtomicU32,
    fail_kind: Mutex<ErrorKind>,
    fail_fragment: Mutex<Option<(String, ErrorKind)>>,
    fail_on_commit: AtomicBool,
    fail_on_connect: AtomicBool,
    begins: AtomicU32,
    commits: AtomicU32,
    rollbacks: AtomicU32,
    active: Mutex<HashSet<u64>>,
    next_transaction: AtomicU64,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            rows_by_fragment: Mutex::new(Vec::new()),
            default_rows: AtomicI64::new(1),
            fail_remaining: AtomicU32::new(0),
            fail_kind: Mutex::new(ErrorKind::Database),
            fail_fragment: Mutex::new(None),
            fail_on_commit: AtomicBool::new(false),
            fail_on_connect: AtomicBool::new(false),
            begins: AtomicU32::new(0),
            commits: AtomicU32::new(0),
            rollbacks: AtomicU32::new(0),
            active: Mutex::new(HashSet::new()),
            next_transaction: AtomicU64::new(1),
        }
    }

    /// Rows reported for statements with no fragment override.
    pub fn set_default_rows(&self, rows: i64) {
        self.default_rows.store(rows, Ordering::Relaxed);
    }

    /// Rows reported for statements whose SQL contains `fragment`.
    pub fn set_rows_for(&self, fragment: &str, rows: i64) {
        self.rows_by_fragment
            .lock()
            .unwrap()
            .push((fragment.to_string(), rows));
    }

    /// Fail the next `times` executions with an error of `kind`.
    pub fn fail_next(&self, times: u32, kind: ErrorKind) {
        self.fail_remaining.store(times, Ordering::Relaxed);
        *self.fail_kind.lock().unwrap() = kind;
    }

    /// Fail every execution whose SQL contains `fragment`.
    pub fn fail_on_sql(&self, fragment: &str, kind: ErrorKind) {
        *self.fail_fragment.lock().unwrap() = Some((fragment.to_string(), kind));
    }

    /// Make commit attempts fail; the transaction stays open for rollback.
    pub fn fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::Relaxed);
    }

    pub fn fail_on_connect(&self, fail: bool) {
        self.fail_on_connect.store(fail, Ordering::Relaxed);
    }

    /// Every statement executed so far, in order.
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.executed.lock().unwrap().clone()
    }

    pub fn execute_calls(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn begin_calls(&self) -> u32 {
        self.begins.load(Ordering::Relaxed)
    }

    pub fn commit_calls(&self) -> u32 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn rollback_calls(&self) -> u32 {
        self.rollbacks.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn ensure_connection(&self) -> DriverResult<()> {
        if self.fail_on_connect.load(Ordering::Relaxed) {
            return Err(DriverError::new(
                ErrorKind::Connection,
                "injected connection failure",
            ));
        }
        Ok(())
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }

    async fn begin(&self) -> DriverResult<TransactionHandle> {
        self.begins.fetch_add(1, Ordering::Relaxed);
        let id = self.next_transaction.fetch_add(1, Ordering::Relaxed);
        self.active.lock().unwrap().insert(id);
        Ok(TransactionHandle::new(id))
    }

    async fn commit(&self, transaction: TransactionHandle) -> DriverResult<()> {
        self.commits.fetch_add(1, Ordering::Relaxed);
        if self.fail_on_commit.load(Ordering::Relaxed) {
            return Err(DriverError::new(
                ErrorKind::Database,
                "injected commit failure",
            ));
        }
        if !self.active.lock().unwrap().remove(&transaction.id()) {
            return Err(DriverError::new(
                ErrorKind::Internal,
                "unknown transaction handle",
            ));
        }
        Ok(())
    }

    async fn rollback(&self, transaction: TransactionHandle) -> DriverResult<()> {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        if !self.active.lock().unwrap().remove(&transaction.id()) {
            return Err(DriverError::new(
                ErrorKind::Internal,
                "unknown transaction handle",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        statement: &Statement,
        transaction: Option<TransactionHandle>,
    ) -> DriverResult<i64> {
        let (sql, _) = statement.build(&SqliteQueryBuilder);
        self.executed.lock().unwrap().push(ExecutedStatement {
            sql: sql.clone(),
            transaction,
        });

        if let Some(handle) = transaction {
            if !self.active.lock().unwrap().contains(&handle.id()) {
                return Err(DriverError::new(
                    ErrorKind::Internal,
                    "unknown transaction handle",
                ));
            }
        }

        if self.fail_remaining.load(Ordering::Relaxed) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::Relaxed);
            let kind = *self.fail_kind.lock().unwrap();
            return Err(DriverError::new(kind, "injected execution failure"));
        }

        if let Some((fragment, kind)) = self.fail_fragment.lock().unwrap().as_ref() {
            if sql.contains(fragment) {
                return Err(DriverError::new(
                    *kind,
                    format!("injected failure for `{fragment}`"),
                ));
            }
        }

        let rows = self
            .rows_by_fragment
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| sql.contains(fragment))
            .map(|(_, rows)| *rows)
            .unwrap_or_else(|| self.default_rows.load(Ordering::Relaxed));
        Ok(rows)
    }
}
