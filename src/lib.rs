//! dbatch - fluent batching, retry, and transaction orchestration for SQL
//! command execution.
//!
//! Callers queue data-modification commands on a [`CommandBatch`] (raw SQL
//! or mapped entity operations), optionally open a transaction and attach a
//! [`RetryPolicy`], then execute the batch as a unit. Per-command outcomes
//! are merged into one [`CommandResult`]; the transaction commits only when
//! the whole merged outcome succeeded and rolls back otherwise.
//!
//! Storage is reached through the [`Driver`] trait; sqlite and postgres
//! adapters over `sqlx` are feature-gated (`sqlite` is on by default), and
//! [`driver::MockDriver`] backs tests.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dbatch::driver::SqliteDriver;
//! use dbatch::{Engine, ExecuteOptions, RetryPolicy};
//!
//! # async fn demo() -> dbatch::Result<()> {
//! let driver = SqliteDriver::connect("sqlite:app.db?mode=rwc").await?;
//! let engine = Engine::new(Arc::new(driver));
//!
//! let mut batch = engine
//!     .batch()
//!     .with_transaction()
//!     .await?
//!     .with_retry(RetryPolicy::new(3).retry_on_any())
//!     .add_custom_command("DELETE FROM sessions WHERE expired = 1")?
//!     .add_custom_command("DELETE FROM tokens WHERE expired = 1")?;
//!
//! let result = batch.execute(ExecuteOptions::new()).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod driver;
pub mod engine;
pub mod entity;
pub mod error;
pub mod result;
pub mod retry;
pub mod statement;

pub use command::{ObjectCommand, Operation, RawCommand};
pub use config::{init_driver, DatabaseConfig};
pub use driver::{Driver, DriverResult, TransactionHandle};
pub use engine::{CommandBatch, Dispatcher, Engine, ExecuteOptions};
pub use entity::Entity;
pub use error::{AttemptErrors, DriverError, Error, ErrorKind, Result};
pub use result::{CommandResult, ResultCollection};
pub use retry::{RetryPolicy, RetrySession};
pub use statement::Statement;

// Statement ASTs and bound values in the public API are sea-query types.
pub use sea_query;
