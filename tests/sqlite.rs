//! End-to-end behavior against the sqlite driver with an in-memory pool.

#![cfg(feature = "sqlite")]

mod common;

use dbatch::{
    DatabaseConfig, Engine, Error, ErrorKind, ExecuteOptions, ObjectCommand, RawCommand,
};

use common::Project;

const CREATE_PROJECTS: &str =
    "CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT NOT NULL)";

/// One engine per test: a single-connection pool keeps every statement on
/// the same in-memory database.
async fn engine() -> Engine {
    let config = DatabaseConfig {
        max_connections: 1,
        ..DatabaseConfig::default()
    };
    let driver = dbatch::init_driver(&config).await.unwrap();
    let engine = Engine::new(driver);

    let mut batch = engine.batch();
    let result = batch
        .execute_raw(CREATE_PROJECTS, ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.error.is_none());
    engine
}

/// Rows affected by an update of the given id; used to observe state
/// without a query interface.
async fn update_rows(engine: &Engine, id: i32) -> i64 {
    let mut batch = engine.batch();
    let result = batch
        .execute_command(
            &RawCommand::new("UPDATE projects SET name = name WHERE id = ?").bind(id),
            ExecuteOptions::new(),
        )
        .await
        .unwrap();
    result.rows_affected
}

#[tokio::test]
async fn ddl_affects_no_rows_and_carries_no_error() {
    let engine = engine().await;
    let mut batch = engine.batch();
    let result = batch
        .execute_raw(
            "CREATE TABLE owners (id INTEGER PRIMARY KEY)",
            ExecuteOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 0);
    assert!(!result.success);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn mapped_operations_round_trip() {
    let engine = engine().await;
    let mut batch = engine.batch();

    let project = Project::new(1, "alpha");
    let result = batch
        .execute_entity(&ObjectCommand::insert(project.clone()), ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.rows_affected, 1);

    let renamed = Project::new(1, "alpha-2");
    let result = batch
        .execute_entity(&ObjectCommand::update(renamed.clone()), ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);

    let result = batch
        .execute_entity(&ObjectCommand::delete(renamed.clone()), ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);

    // Updating the deleted row affects nothing: data-not-found.
    let result = batch
        .execute_entity(&ObjectCommand::update(renamed), ExecuteOptions::new())
        .await
        .unwrap();
    assert!(!result.success);
    assert!(matches!(result.error, Some(Error::DataNotFound)));
}

#[tokio::test]
async fn raw_commands_bind_positional_parameters() {
    let engine = engine().await;
    let mut batch = engine.batch();

    let insert = RawCommand::new("INSERT INTO projects (id, name) VALUES (?, ?)")
        .bind(7)
        .bind("gamma");
    let result = batch
        .execute_command(&insert, ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.rows_affected, 1);
    assert_eq!(update_rows(&engine, 7).await, 1);
}

#[tokio::test]
async fn transactional_batch_commits_all_members() {
    let engine = engine().await;

    let entities = vec![Project::new(1, "alpha"), Project::new(2, "beta")];
    let mut batch = engine
        .batch()
        .with_transaction()
        .await
        .unwrap()
        .add_insert_commands(&entities)
        .unwrap();
    let result = batch.execute(ExecuteOptions::new()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.rows_affected, 2);
    assert!(!batch.in_transaction());
    assert_eq!(update_rows(&engine, 1).await, 1);
    assert_eq!(update_rows(&engine, 2).await, 1);
}

#[tokio::test]
async fn failed_transactional_batch_leaves_no_rows_behind() {
    let engine = engine().await;

    let mut batch = engine
        .batch()
        .with_transaction()
        .await
        .unwrap()
        .add_insert_command(&Project::new(3, "gamma"))
        .unwrap()
        .add_custom_command("INSERT INTO missing_table (id) VALUES (1)")
        .unwrap();
    let result = batch.execute(ExecuteOptions::new()).await.unwrap();

    assert!(!result.success);
    assert!(matches!(result.error, Some(Error::Merged(_))));
    assert!(!batch.in_transaction());
    // The insert that succeeded mid-batch was rolled back with the rest.
    assert_eq!(update_rows(&engine, 3).await, 0);
}

#[tokio::test]
async fn scripted_entity_commands_bind_the_target() {
    let engine = engine().await;
    let mut batch = engine.batch();

    batch
        .execute_entity(
            &ObjectCommand::insert(Project::new(5, "epsilon")),
            ExecuteOptions::new(),
        )
        .await
        .unwrap();

    let command = ObjectCommand::execute_script(
        Project::new(5, "epsilon-2"),
        "UPDATE projects SET name = ? WHERE id = ?",
    );
    let result = batch
        .execute_entity(&command, ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);

    // A script matching nothing still executes successfully.
    let command = ObjectCommand::execute_script(
        Project::new(99, "nobody"),
        "UPDATE projects SET name = ? WHERE id = ?",
    );
    let result = batch
        .execute_entity(&command, ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn driver_failures_carry_a_database_classification() {
    let engine = engine().await;
    let mut batch = engine.batch();

    let result = batch
        .execute_raw(
            "INSERT INTO missing_table (id) VALUES (1)",
            ExecuteOptions::new(),
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.rows_affected, -1);
    let error = result.error.expect("driver error");
    assert_eq!(error.kind(), ErrorKind::Database);
}
