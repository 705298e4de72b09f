//! Execution engine: fluent builder, execute shapes, retry gating, and
//! transaction coordination.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::{CommandKind, ObjectCommand, QueuedCommand, RawCommand};
use crate::driver::{Driver, TransactionHandle};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::result::{CommandResult, ResultCollection};
use crate::retry::{RetryPolicy, RetrySession};
use crate::statement::Statement;

/// Post-execution callback, run exactly once per top-level execute call
/// that reaches execution, before any error is surfaced.
pub type Dispatcher = Box<dyn FnMut() + Send>;

/// Options accepted by every execute shape.
#[derive(Default)]
pub struct ExecuteOptions {
    throw_on_failure: bool,
    dispatcher: Option<Dispatcher>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface a failed outcome as a raised error instead of a result
    /// value. Only applies when the outcome carries an error.
    pub fn throw_on_failure(mut self) -> Self {
        self.throw_on_failure = true;
        self
    }

    /// Attach a post-execution callback.
    pub fn dispatcher(mut self, dispatcher: impl FnMut() + Send + 'static) -> Self {
        self.dispatcher = Some(Box::new(dispatcher));
        self
    }

    fn dispatch(&mut self) {
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher();
        }
    }
}

/// Entry point: owns the driver and hands out command batches.
pub struct Engine {
    driver: Arc<dyn Driver>,
}

impl Engine {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Create a fresh command batch bound to this engine's driver.
    pub fn batch(&self) -> CommandBatch {
        CommandBatch::new(self.driver.clone())
    }

    /// Probe the driver connection.
    pub async fn check_connection(&self) -> bool {
        self.driver.ensure_connection().await.is_ok()
    }
}

/// What one execution call runs: a single command, an explicit collection,
/// or the contents of the queue.
#[derive(Clone, Copy)]
enum Plan<'a> {
    Drain,
    Single(&'a QueuedCommand),
    Batch(&'a [QueuedCommand]),
}

/// A fluent batch of deferred commands plus the state their execution
/// shares: retry policy, transaction handle, and the FIFO queue.
///
/// Execution methods take `&mut self`, so the borrow checker enforces the
/// one-execution-at-a-time contract; the queue stays observable through
/// [`pending`](Self::pending) after every call.
pub struct CommandBatch {
    driver: Arc<dyn Driver>,
    queue: VecDeque<QueuedCommand>,
    retry: Option<RetryPolicy>,
    transaction: Option<TransactionHandle>,
    multiple_mode: bool,
}

impl std::fmt::Debug for CommandBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBatch")
            .field("queue_len", &self.queue.len())
            .field("has_retry", &self.retry.is_some())
            .field("has_transaction", &self.transaction.is_some())
            .field("multiple_mode", &self.multiple_mode)
            .finish()
    }
}

impl CommandBatch {
    fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            queue: VecDeque::new(),
            retry: None,
            transaction: None,
            multiple_mode: false,
        }
    }

    // ---- fluent builder ----

    /// Attach a retry policy to subsequent executions.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Begin a transaction; queued commands and commands executed through
    /// this batch run inside it until commit or rollback.
    ///
    /// A handle left over from an earlier call is discarded, not rolled
    /// back; beginning a second transaction while one is open is a caller
    /// error this only warns about.
    pub async fn with_transaction(mut self) -> Result<Self> {
        self.driver.ensure_connection().await?;
        if self.transaction.take().is_some() {
            warn!("discarding stale transaction handle before beginning a new transaction");
        }
        let handle = self.driver.begin().await?;
        self.transaction = Some(handle);
        Ok(self)
    }

    /// Queue a raw SQL command.
    pub fn add_custom_command(mut self, script: impl Into<String>) -> Result<Self> {
        let command = RawCommand::new(script);
        command.validate()?;
        self.enqueue(command.into_queued());
        Ok(self)
    }

    /// Queue a collection of raw commands, one queue entry per command.
    pub fn add_custom_commands(
        mut self,
        commands: impl IntoIterator<Item = RawCommand>,
    ) -> Result<Self> {
        let commands: Vec<RawCommand> = commands.into_iter().collect();
        RawCommand::validate_all(&commands)?;
        for command in commands {
            self.enqueue(command.into_queued());
        }
        Ok(self)
    }

    /// Queue an insert of `entity`.
    pub fn add_insert_command<T: Entity>(mut self, entity: &T) -> Result<Self> {
        self.enqueue(QueuedCommand::mapped(Statement::Insert(
            entity.insert_statement(),
        )));
        Ok(self)
    }

    /// Queue one insert per entity.
    pub fn add_insert_commands<'a, T, I>(mut self, entities: I) -> Result<Self>
    where
        T: Entity + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for entity in entities {
            self = self.add_insert_command(entity)?;
        }
        Ok(self)
    }

    /// Queue an update of `entity`.
    pub fn add_update_command<T: Entity>(mut self, entity: &T) -> Result<Self> {
        self.enqueue(QueuedCommand::mapped(Statement::Update(
            entity.update_statement(),
        )));
        Ok(self)
    }

    /// Queue one update per entity.
    pub fn add_update_commands<'a, T, I>(mut self, entities: I) -> Result<Self>
    where
        T: Entity + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for entity in entities {
            self = self.add_update_command(entity)?;
        }
        Ok(self)
    }

    /// Queue a delete of `entity`.
    pub fn add_delete_command<T: Entity>(mut self, entity: &T) -> Result<Self> {
        self.enqueue(QueuedCommand::mapped(Statement::Delete(
            entity.delete_statement(),
        )));
        Ok(self)
    }

    /// Queue one delete per entity.
    pub fn add_delete_commands<'a, T, I>(mut self, entities: I) -> Result<Self>
    where
        T: Entity + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for entity in entities {
            self = self.add_delete_command(entity)?;
        }
        Ok(self)
    }

    /// Number of commands waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a transaction is currently open on this batch.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn enqueue(&mut self, command: QueuedCommand) {
        self.queue.push_back(command);
        self.multiple_mode = true;
    }

    // ---- execute family ----

    /// Drain the queue: dequeue and run every command in FIFO order, merge
    /// the outcomes, and settle the transaction. Always runs through the
    /// retry orchestrator once, for the drain as a whole.
    pub async fn execute(&mut self, options: ExecuteOptions) -> Result<CommandResult> {
        self.driver.ensure_connection().await?;
        self.run(Plan::Drain, true, options).await
    }

    /// Execute a single raw script immediately.
    pub async fn execute_raw(
        &mut self,
        script: &str,
        options: ExecuteOptions,
    ) -> Result<CommandResult> {
        let command = RawCommand::new(script);
        command.validate()?;
        self.driver.ensure_connection().await?;
        let queued = command.into_queued();
        self.run(Plan::Single(&queued), false, options).await
    }

    /// Execute a single raw command immediately.
    pub async fn execute_command(
        &mut self,
        command: &RawCommand,
        options: ExecuteOptions,
    ) -> Result<CommandResult> {
        command.validate()?;
        self.driver.ensure_connection().await?;
        let queued = command.clone().into_queued();
        self.run(Plan::Single(&queued), false, options).await
    }

    /// Execute a collection of raw commands sequentially, merging the
    /// outcomes and settling the transaction.
    pub async fn execute_commands(
        &mut self,
        commands: &[RawCommand],
        options: ExecuteOptions,
    ) -> Result<CommandResult> {
        RawCommand::validate_all(commands)?;
        self.driver.ensure_connection().await?;
        let queued: Vec<QueuedCommand> =
            commands.iter().map(|c| c.clone().into_queued()).collect();
        self.run(Plan::Batch(&queued), false, options).await
    }

    /// Execute a single object command immediately.
    pub async fn execute_entity<T: Entity>(
        &mut self,
        command: &ObjectCommand<T>,
        options: ExecuteOptions,
    ) -> Result<CommandResult> {
        let queued = command.to_queued()?;
        self.driver.ensure_connection().await?;
        self.run(Plan::Single(&queued), false, options).await
    }

    /// Execute a collection of object commands sequentially, merging the
    /// outcomes and settling the transaction.
    pub async fn execute_entities<T: Entity>(
        &mut self,
        commands: &[ObjectCommand<T>],
        options: ExecuteOptions,
    ) -> Result<CommandResult> {
        let queued = commands
            .iter()
            .map(|c| c.to_queued())
            .collect::<Result<Vec<_>>>()?;
        self.driver.ensure_connection().await?;
        self.run(Plan::Batch(&queued), false, options).await
    }

    // ---- execute family, custom return value ----

    /// Drain the queue, then produce the caller's value. The provider runs
    /// only when execution did not raise; it ignores success or failure.
    pub async fn execute_returning<R>(
        &mut self,
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute(options).await?;
        Ok(provider())
    }

    /// Execute a raw script, then produce the caller's value.
    pub async fn execute_raw_returning<R>(
        &mut self,
        script: &str,
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute_raw(script, options).await?;
        Ok(provider())
    }

    /// Execute a raw command, then produce the caller's value.
    pub async fn execute_command_returning<R>(
        &mut self,
        command: &RawCommand,
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute_command(command, options).await?;
        Ok(provider())
    }

    /// Execute raw commands, then produce the caller's value.
    pub async fn execute_commands_returning<R>(
        &mut self,
        commands: &[RawCommand],
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute_commands(commands, options).await?;
        Ok(provider())
    }

    /// Execute an object command, then produce the caller's value.
    pub async fn execute_entity_returning<T: Entity, R>(
        &mut self,
        command: &ObjectCommand<T>,
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute_entity(command, options).await?;
        Ok(provider())
    }

    /// Execute object commands, then produce the caller's value.
    pub async fn execute_entities_returning<T: Entity, R>(
        &mut self,
        commands: &[ObjectCommand<T>],
        provider: impl FnOnce() -> R,
        options: ExecuteOptions,
    ) -> Result<R> {
        self.execute_entities(commands, options).await?;
        Ok(provider())
    }

    // ---- core ----

    /// Run a plan, wrapped in a retry session unless multiple-command mode
    /// delegates error handling to the per-command level. The dispatcher
    /// fires exactly once, before any error leaves this call.
    async fn run(
        &mut self,
        plan: Plan<'_>,
        force_session: bool,
        mut options: ExecuteOptions,
    ) -> Result<CommandResult> {
        let throw_on_failure = options.throw_on_failure;
        let outcome = if force_session || !self.multiple_mode {
            let mut session = RetrySession::new(self.retry.clone());
            while session.wants_attempt() {
                let attempt = self.run_plan(plan, throw_on_failure).await;
                session.record(attempt);
            }
            session.finish(false)
        } else {
            self.run_plan(plan, throw_on_failure).await
        };

        options.dispatch();
        let result = outcome?;
        Self::apply_throw_policy(result, throw_on_failure)
    }

    fn apply_throw_policy(mut result: CommandResult, throw_on_failure: bool) -> Result<CommandResult> {
        if throw_on_failure && !result.success {
            if let Some(error) = result.error.take() {
                return Err(error);
            }
        }
        Ok(result)
    }

    async fn run_plan(&mut self, plan: Plan<'_>, throw_on_failure: bool) -> Result<CommandResult> {
        match plan {
            Plan::Single(command) => self.run_command(command, throw_on_failure, false).await,
            Plan::Batch(commands) => {
                let mut results = ResultCollection::new();
                for command in commands {
                    let result = self.run_command(command, false, true).await?;
                    results.push(result);
                }
                self.settle(results).await
            }
            Plan::Drain => {
                let mut results = ResultCollection::new();
                while let Some(command) = self.queue.pop_front() {
                    let result = self.run_command(&command, false, true).await?;
                    results.push(result);
                }
                debug!(commands = results.len(), "queue drained");
                self.settle(results).await
            }
        }
    }

    /// Execute one command against the active transaction context.
    ///
    /// Inline mode (batch members) captures every failure into the result.
    /// Single mode raises when the caller asked to throw, or when the error
    /// is retryable so the surrounding session can grant another attempt.
    async fn run_command(
        &mut self,
        command: &QueuedCommand,
        throw_on_failure: bool,
        inline: bool,
    ) -> Result<CommandResult> {
        match self.driver.execute(&command.statement, self.transaction).await {
            Ok(rows) => Ok(Self::interpret(command.kind, rows)),
            Err(driver_error) => {
                let error = Error::Driver(driver_error);
                if !inline && (throw_on_failure || self.is_retryable(&error)) {
                    return Err(error);
                }
                Ok(CommandResult::failed(error))
            }
        }
    }

    /// Translate an affected-row count into an outcome per command kind.
    fn interpret(kind: CommandKind, rows: i64) -> CommandResult {
        match kind {
            CommandKind::Raw => CommandResult::new(rows, rows > 0),
            CommandKind::Mapped => Self::mapped_outcome(rows > 0),
            CommandKind::Script => Self::mapped_outcome(rows != -1),
        }
    }

    /// Mapped operations report a boolean outcome as 0/1 rows; an
    /// ineffective one without a driver error defaults to data-not-found
    /// so callers can tell "no effect" apart from "raised".
    fn mapped_outcome(success: bool) -> CommandResult {
        let mut result = CommandResult::new(i64::from(success), success);
        if !success {
            result.error = Some(Error::DataNotFound);
        }
        result
    }

    fn is_retryable(&self, error: &Error) -> bool {
        self.retry
            .as_ref()
            .is_some_and(|policy| policy.is_retryable(error))
    }

    // ---- transaction coordination ----

    /// Merge-aware settlement: commit on success, roll back otherwise. A
    /// commit failure replaces the merged outcome as the operative error.
    async fn settle(&mut self, results: ResultCollection) -> Result<CommandResult> {
        let mut merged = results.merge();
        if let Some(commit_error) = self.commit_or_rollback(&merged).await {
            merged.success = false;
            merged.error = Some(commit_error);
        }
        Ok(merged)
    }

    /// Returns the commit failure when one occurred; `None` otherwise.
    async fn commit_or_rollback(&mut self, merged: &CommandResult) -> Option<Error> {
        if merged.success {
            if let Err(error) = self.ensure_commit().await {
                self.ensure_rollback().await;
                return Some(error);
            }
            None
        } else {
            self.ensure_rollback().await;
            None
        }
    }

    /// Commit the open transaction, but only once the queue is fully
    /// drained; committing mid-batch would persist half the work.
    async fn ensure_commit(&mut self) -> Result<()> {
        if let Some(handle) = self.transaction {
            if self.queue.is_empty() {
                self.driver.commit(handle).await.map_err(Error::Commit)?;
                self.transaction = None;
            }
        }
        Ok(())
    }

    /// Roll back the open transaction behind the same queue-empty gate.
    /// Rollback failures are logged, not surfaced; the operative error is
    /// whatever made the batch fail.
    async fn ensure_rollback(&mut self) {
        if let Some(handle) = self.transaction {
            if self.queue.is_empty() {
                if let Err(error) = self.driver.rollback(handle).await {
                    warn!(%error, "rollback failed");
                }
                self.transaction = None;
            }
        }
    }
}
