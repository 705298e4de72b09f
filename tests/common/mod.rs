#![allow(dead_code)]

use sea_query::{DeleteStatement, Expr, Iden, InsertStatement, Query, UpdateStatement, Values};

use dbatch::Entity;

#[derive(Iden)]
pub enum Projects {
    Table,
    Id,
    Name,
}

/// Minimal mapped entity used across the integration suites.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i32,
    pub name: String,
}

impl Project {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Entity for Project {
    fn insert_statement(&self) -> InsertStatement {
        Query::insert()
            .into_table(Projects::Table)
            .columns([Projects::Id, Projects::Name])
            .values_panic([self.id.into(), self.name.clone().into()])
            .to_owned()
    }

    fn update_statement(&self) -> UpdateStatement {
        Query::update()
            .table(Projects::Table)
            .value(Projects::Name, self.name.clone())
            .and_where(Expr::col(Projects::Id).eq(self.id))
            .to_owned()
    }

    fn delete_statement(&self) -> DeleteStatement {
        Query::delete()
            .from_table(Projects::Table)
            .and_where(Expr::col(Projects::Id).eq(self.id))
            .to_owned()
    }

    fn script_parameters(&self) -> Values {
        Values(vec![self.name.clone().into(), self.id.into()])
    }
}
