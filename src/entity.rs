//! Object-to-row mapping seam.
//!
//! The engine never inspects entity types; it only asks them for the
//! sea-query statements that persist them. Implementations decide table
//! names, column sets, and key predicates.

use sea_query::{DeleteStatement, InsertStatement, UpdateStatement, Values};

/// A value that can be inserted, updated, or deleted as one row.
///
/// Statements are returned as sea-query ASTs and rendered by whichever
/// driver executes them, so implementations stay backend-neutral.
///
/// ```
/// use dbatch::sea_query::{DeleteStatement, Expr, Iden, InsertStatement, Query, UpdateStatement};
/// use dbatch::Entity;
///
/// #[derive(Iden)]
/// enum Projects {
///     Table,
///     Id,
///     Name,
/// }
///
/// struct Project {
///     id: i32,
///     name: String,
/// }
///
/// impl Entity for Project {
///     fn insert_statement(&self) -> InsertStatement {
///         Query::insert()
///             .into_table(Projects::Table)
///             .columns([Projects::Id, Projects::Name])
///             .values_panic([self.id.into(), self.name.clone().into()])
///             .to_owned()
///     }
///
///     fn update_statement(&self) -> UpdateStatement {
///         Query::update()
///             .table(Projects::Table)
///             .value(Projects::Name, self.name.clone())
///             .and_where(Expr::col(Projects::Id).eq(self.id))
///             .to_owned()
///     }
///
///     fn delete_statement(&self) -> DeleteStatement {
///         Query::delete()
///             .from_table(Projects::Table)
///             .and_where(Expr::col(Projects::Id).eq(self.id))
///             .to_owned()
///     }
/// }
/// ```
pub trait Entity {
    /// Statement inserting this value as a new row.
    fn insert_statement(&self) -> InsertStatement;

    /// Statement updating the row this value identifies.
    fn update_statement(&self) -> UpdateStatement;

    /// Statement deleting the row this value identifies.
    fn delete_statement(&self) -> DeleteStatement;

    /// Positional values bound to a scripted command targeting this value.
    ///
    /// Used by `Operation::ExecuteScript`; the default binds nothing.
    fn script_parameters(&self) -> Values {
        Values(Vec::new())
    }
}
