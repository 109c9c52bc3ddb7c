//! Database initialization against real files

use rpt_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use rpt_common::db::{Database, DatabaseOptions};
use rpt_common::registry::RegistryKind;
use rpt_common::Core;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("problems.db");

    let db = Database::init(&db_path).await.unwrap();

    assert!(db_path.exists(), "Database file was not created");
    assert_eq!(db.path(), Some(db_path.as_path()));
    assert_eq!(get_schema_version(db.pool()).await.unwrap(), CURRENT_SCHEMA_VERSION);

    db.shutdown().await;
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("problems.db");

    let db = Database::init(&db_path).await.unwrap();
    let acme = Core::new(db.pool().clone())
        .get_or_create_customer("Acme")
        .await
        .unwrap();
    db.shutdown().await;

    let db = Database::init(&db_path).await.unwrap();
    let core = Core::new(db.pool().clone());
    assert_eq!(core.get_or_create_customer("Acme").await.unwrap(), acme);
    assert_eq!(core.list_customers().await.unwrap().len(), 1);

    db.shutdown().await;
}

#[tokio::test]
async fn test_custom_pool_options() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("problems.db");
    let options = DatabaseOptions {
        max_connections: 2,
        busy_timeout_ms: 250,
    };

    let db = Database::init_with(&db_path, &options).await.unwrap();
    let registry = Core::new(db.pool().clone());
    registry
        .registry()
        .seed(RegistryKind::Employee, &["Montana Marsh".to_string()])
        .await
        .unwrap();

    assert_eq!(registry.list_employees().await.unwrap().len(), 1);
    db.shutdown().await;
}
