//! Backend-neutral statement representation.
//!
//! Commands are stored as data: either a raw SQL string with bound values,
//! or a sea-query AST built by an [`crate::Entity`] implementation. Each
//! driver renders the AST with its own query builder, so placeholder syntax
//! stays a driver concern.

use sea_query::{
    DeleteStatement, InsertStatement, QueryBuilder, UpdateStatement, Values,
};

/// A single executable statement.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Raw SQL with positional bound values.
    Raw { sql: String, values: Values },
    /// Mapped insert built from an entity.
    Insert(InsertStatement),
    /// Mapped update built from an entity.
    Update(UpdateStatement),
    /// Mapped delete built from an entity.
    Delete(DeleteStatement),
}

impl Statement {
    /// Raw statement without bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw {
            sql: sql.into(),
            values: Values(Vec::new()),
        }
    }

    /// Render to SQL text plus bound values with the given query builder.
    pub fn build(&self, query_builder: &dyn QueryBuilder) -> (String, Values) {
        match self {
            Self::Raw { sql, values } => (sql.clone(), values.clone()),
            Self::Insert(stmt) => stmt.build_any(query_builder),
            Self::Update(stmt) => stmt.build_any(query_builder),
            Self::Delete(stmt) => stmt.build_any(query_builder),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_query::{Expr, Iden, Query, SqliteQueryBuilder, Value};

    use super::*;

    #[derive(Iden)]
    enum Jobs {
        Table,
        Id,
        State,
    }

    #[test]
    fn raw_statement_builds_verbatim() {
        let statement = Statement::Raw {
            sql: "DELETE FROM jobs WHERE id = ?".into(),
            values: Values(vec![Value::from(7)]),
        };
        let (sql, values) = statement.build(&SqliteQueryBuilder);
        assert_eq!(sql, "DELETE FROM jobs WHERE id = ?");
        assert_eq!(values.0.len(), 1);
    }

    #[test]
    fn mapped_statement_renders_with_builder() {
        let statement = Statement::Update(
            Query::update()
                .table(Jobs::Table)
                .value(Jobs::State, "done")
                .and_where(Expr::col(Jobs::Id).eq(3))
                .to_owned(),
        );
        let (sql, values) = statement.build(&SqliteQueryBuilder);
        assert!(sql.starts_with("UPDATE \"jobs\""));
        assert_eq!(values.0.len(), 2);
    }
}
