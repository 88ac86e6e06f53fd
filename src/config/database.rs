//! Database configuration module for the census service.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs without hand-written SQL.

use crate::config::app::AppConfig;
use crate::entities::{Professional, Role, School, Setting, Submission, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Directory that must exist before `SQLite` can create the database file.
fn sqlite_parent_dir(url: &str) -> Option<&Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to the database named in the configuration.
pub async fn create_connection(config: &AppConfig) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        std::fs::create_dir_all(dir)?;
    }
    debug!("Connecting to database at {}", config.database.url);
    Database::connect(&config.database.url)
        .await
        .map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table the service needs, skipping the ones that already exist.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, School).await?;
    create_table(db, &schema, Submission).await?;
    create_table(db, &schema, Professional).await?;
    create_table(db, &schema, Role).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Setting).await?;

    info!("Database tables ready");
    Ok(())
}
