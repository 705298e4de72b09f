//! Execution results and their aggregation.

use std::time::Duration;

use crate::error::{message_chain, Error};

/// Outcome of one command execution (or of a merged sequence of them).
#[derive(Debug)]
pub struct CommandResult {
    /// Rows affected; `-1` when the execution failed outright.
    pub rows_affected: i64,
    pub success: bool,
    /// Failure detail, when any. A result can be unsuccessful without an
    /// error (raw statement affecting zero rows).
    pub error: Option<Error>,
    /// Wall-clock time of the whole (possibly retried) execution. Stamped
    /// by the retry orchestrator; zero for inline command results.
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn new(rows_affected: i64, success: bool) -> Self {
        Self {
            rows_affected,
            success,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Failed execution: `-1` rows, carrying the error.
    pub fn failed(error: Error) -> Self {
        Self {
            rows_affected: -1,
            success: false,
            error: Some(error),
            elapsed: Duration::ZERO,
        }
    }
}

/// Ordered, append-only collection of per-command results, consumed once
/// by [`ResultCollection::merge`].
#[derive(Debug, Default)]
pub struct ResultCollection {
    results: Vec<CommandResult>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: CommandResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandResult> {
        self.results.iter()
    }

    /// Collapse every member into a single result.
    ///
    /// An empty collection merges to `{0 rows, success: false, no error}`.
    /// Otherwise rows are summed, success requires every member to have
    /// succeeded, and the failures' message chains are flattened into one
    /// `;`-joined composite error.
    pub fn merge(self) -> CommandResult {
        let mut merged = CommandResult::new(0, false);
        if self.results.is_empty() {
            return merged;
        }

        merged.rows_affected = self.results.iter().map(|r| r.rows_affected).sum();
        if self.results.iter().all(|r| r.success) {
            merged.success = true;
            return merged;
        }

        let mut messages = Vec::new();
        for result in self.results.iter().filter(|r| !r.success) {
            if let Some(error) = &result.error {
                messages.extend(message_chain(error));
            }
        }
        merged.error = Some(Error::Merged(messages.join(";")));
        merged
    }
}

impl FromIterator<CommandResult> for ResultCollection {
    fn from_iter<I: IntoIterator<Item = CommandResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{DriverError, ErrorKind};

    use super::*;

    #[test]
    fn merge_of_empty_collection_is_a_fixed_default() {
        let merged = ResultCollection::new().merge();
        assert_eq!(merged.rows_affected, 0);
        assert!(!merged.success);
        assert!(merged.error.is_none());
    }

    #[test]
    fn merge_sums_rows_when_all_succeed() {
        let mut results = ResultCollection::new();
        results.push(CommandResult::new(1, true));
        results.push(CommandResult::new(2, true));

        let merged = results.merge();
        assert_eq!(merged.rows_affected, 3);
        assert!(merged.success);
        assert!(merged.error.is_none());
    }

    #[test]
    fn merge_flattens_failure_message_chains() {
        let failure = Error::Driver(DriverError::with_source(
            ErrorKind::Database,
            "constraint violated",
            std::io::Error::other("unique index"),
        ));

        let mut results = ResultCollection::new();
        results.push(CommandResult::new(1, true));
        results.push(CommandResult::failed(failure));
        results.push(CommandResult::failed(Error::DataNotFound));

        let merged = results.merge();
        assert_eq!(merged.rows_affected, -1);
        assert!(!merged.success);
        let message = merged.error.expect("composite error").to_string();
        assert_eq!(
            message,
            "constraint violated;unique index;data was not found"
        );
    }

    #[test]
    fn collection_is_ordered_and_observable() {
        let results: ResultCollection = vec![CommandResult::new(5, true), CommandResult::new(7, true)]
            .into_iter()
            .collect();
        assert_eq!(results.len(), 2);
        let rows: Vec<i64> = results.iter().map(|r| r.rows_affected).collect();
        assert_eq!(rows, vec![5, 7]);
    }
}
