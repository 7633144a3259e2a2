use sea_orm::DatabaseConnection;
use tempfile::TempDir;

use crate::models;

/// Fresh in-memory SQLite database with every migration applied.
///
/// Each call gets its own isolated database.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = models::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    models::migrate_up(&db)
        .await
        .expect("Failed to run migrations");

    db
}

/// Migrated SQLite file in a temp dir, behind a multi-connection pool.
///
/// Keep the returned dir alive for as long as the connection is used.
pub async fn setup_pooled_test_db() -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());

    let db = models::connect(&url)
        .await
        .expect("Failed to open file database");

    models::migrate_up(&db)
        .await
        .expect("Failed to run migrations");

    (dir, db)
}
