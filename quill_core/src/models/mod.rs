use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::QuillConfig;

pub mod migrator;

pub async fn open_or_create_db(config: &QuillConfig) -> Result<DatabaseConnection, DbErr> {
    // Use display() to convert PathBuf to string representation
    let connection_string = format!("sqlite://{}?mode=rwc", config.database_path.display());
    connect(&connection_string).await
}

pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);
    if url.contains(":memory:") {
        // every pooled connection would otherwise open its own empty database
        options.max_connections(1);
    }

    let db = Database::connect(options).await?;
    info!(url, "database connected");
    Ok(db)
}

pub async fn migrate_up(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await?;
    info!("migrations applied");
    Ok(())
}
