//! Command descriptors.
//!
//! Callers describe units of work declaratively; the queue stores them as
//! tagged data values rather than closures, which keeps the pending work
//! inspectable and testable.

use sea_query::{Value, Values};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::statement::Statement;

/// Operation performed by an [`ObjectCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Insert the target as a new row.
    Insert,
    /// Update the row the target identifies.
    Update,
    /// Delete the row the target identifies.
    Delete,
    /// Run the attached script with the target's values bound to it.
    ExecuteScript,
}

/// A raw SQL command with optional positional parameters.
#[derive(Debug, Clone)]
pub struct RawCommand {
    pub script: String,
    pub parameters: Values,
}

impl RawCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            parameters: Values(Vec::new()),
        }
    }

    /// Append one positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.parameters.0.push(value.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.script.trim().is_empty() {
            return Err(Error::InvalidCommand("script must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn validate_all(commands: &[Self]) -> Result<()> {
        if commands.is_empty() {
            return Err(Error::InvalidCommand(
                "command collection must not be empty".into(),
            ));
        }
        for command in commands {
            command.validate()?;
        }
        Ok(())
    }

    pub(crate) fn into_queued(self) -> QueuedCommand {
        QueuedCommand {
            kind: CommandKind::Raw,
            statement: Statement::Raw {
                sql: self.script,
                values: self.parameters,
            },
        }
    }
}

/// A command operating on a typed target value.
#[derive(Debug, Clone)]
pub struct ObjectCommand<T> {
    pub operation: Operation,
    pub target: T,
    pub script: Option<String>,
}

impl<T> ObjectCommand<T> {
    pub fn insert(target: T) -> Self {
        Self {
            operation: Operation::Insert,
            target,
            script: None,
        }
    }

    pub fn update(target: T) -> Self {
        Self {
            operation: Operation::Update,
            target,
            script: None,
        }
    }

    pub fn delete(target: T) -> Self {
        Self {
            operation: Operation::Delete,
            target,
            script: None,
        }
    }

    /// Scripted command (stored procedure, function, hand-written DML) run
    /// with the target's values bound to it.
    pub fn execute_script(target: T, script: impl Into<String>) -> Self {
        Self {
            operation: Operation::ExecuteScript,
            target,
            script: Some(script.into()),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let has_script = self
            .script
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if self.operation == Operation::ExecuteScript && !has_script {
            return Err(Error::InvalidCommand(
                "execute-script command requires a script".into(),
            ));
        }
        Ok(())
    }
}

impl<T: Entity> ObjectCommand<T> {
    pub(crate) fn to_queued(&self) -> Result<QueuedCommand> {
        self.validate()?;
        let queued = match self.operation {
            Operation::Insert => {
                QueuedCommand::mapped(Statement::Insert(self.target.insert_statement()))
            }
            Operation::Update => {
                QueuedCommand::mapped(Statement::Update(self.target.update_statement()))
            }
            Operation::Delete => {
                QueuedCommand::mapped(Statement::Delete(self.target.delete_statement()))
            }
            Operation::ExecuteScript => QueuedCommand {
                kind: CommandKind::Script,
                statement: Statement::Raw {
                    sql: self.script.clone().unwrap_or_default(),
                    values: self.target.script_parameters(),
                },
            },
        };
        Ok(queued)
    }
}

/// How a command's affected-row count translates into an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    /// Raw statement: success when at least one row was affected; the raw
    /// row count is reported as-is.
    Raw,
    /// Mapped entity operation: boolean outcome, reported as 0 or 1 rows.
    Mapped,
    /// Scripted entity command: success unless the driver reports the
    /// failure sentinel.
    Script,
}

/// Deferred unit of work held by the queue, dequeued exactly once.
#[derive(Debug, Clone)]
pub(crate) struct QueuedCommand {
    pub(crate) kind: CommandKind,
    pub(crate) statement: Statement,
}

impl QueuedCommand {
    pub(crate) fn mapped(statement: Statement) -> Self {
        Self {
            kind: CommandKind::Mapped,
            statement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_command_rejects_blank_script() {
        assert!(RawCommand::new("  \t").validate().is_err());
        assert!(RawCommand::new("DELETE FROM jobs").validate().is_ok());
    }

    #[test]
    fn raw_collection_must_be_non_empty_and_valid() {
        assert!(RawCommand::validate_all(&[]).is_err());
        let mixed = vec![RawCommand::new("SELECT 1"), RawCommand::new("")];
        assert!(RawCommand::validate_all(&mixed).is_err());
        let good = vec![RawCommand::new("SELECT 1")];
        assert!(RawCommand::validate_all(&good).is_ok());
    }

    #[test]
    fn script_command_requires_script() {
        let command: ObjectCommand<()> = ObjectCommand {
            operation: Operation::ExecuteScript,
            target: (),
            script: None,
        };
        assert!(command.validate().is_err());

        let blank = ObjectCommand::execute_script((), "   ");
        assert!(blank.validate().is_err());

        let ok = ObjectCommand::execute_script((), "UPDATE jobs SET state = 'done'");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn bind_appends_parameters() {
        let command = RawCommand::new("INSERT INTO jobs (id) VALUES (?)").bind(9);
        assert_eq!(command.parameters.0.len(), 1);
    }
}
