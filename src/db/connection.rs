//! Database handle lifecycle and schema management.

use sea_orm::sea_query::Table;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, Schema, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::log::LevelFilter;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entities::{equipment, prelude::*, users};

/// Current schema version, stored in `PRAGMA user_version`.
///
/// A database with any other version is dropped and recreated.
pub const SCHEMA_VERSION: i32 = 3;

/// Explicitly constructed storage handle.
///
/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Storage {
    conn: DatabaseConnection,
}

impl Storage {
    /// Open (creating if needed) the database file described by `config`.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DbErr> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DbErr::Custom(format!("create {}: {e}", parent.display())))?;
        }
        Self::connect(&config.connection_string(), config.max_connections).await
    }

    /// Private in-memory database. Uses a single connection so every query sees the same data.
    pub async fn in_memory() -> Result<Self, DbErr> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Connect and bring the schema to [`SCHEMA_VERSION`].
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(database_url);
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(true)
            .sqlx_logging_level(LevelFilter::Debug);

        let conn = Database::connect(opt).await?;
        let storage = Self { conn };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    /// Underlying connection, for the repositories.
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Test database connection by executing a simple query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.conn.execute_unprepared("SELECT 1").await?;
        Ok(())
    }

    /// Close the pool. Further use of clones fails.
    pub async fn close(self) -> Result<(), DbErr> {
        info!("Closing database");
        self.conn.close().await
    }

    /// Read the stored schema version.
    pub async fn schema_version(&self) -> Result<i32, DbErr> {
        let row = self
            .conn
            .query_one(Statement::from_string(DatabaseBackend::Sqlite, "PRAGMA user_version".to_owned()))
            .await?;

        match row {
            Some(row) => row.try_get("", "user_version"),
            None => Ok(0),
        }
    }

    /// Recreate all tables when the stored version differs from [`SCHEMA_VERSION`].
    ///
    /// There are no migrations: a version change discards existing data.
    pub async fn ensure_schema(&self) -> Result<(), DbErr> {
        let version = self.schema_version().await?;
        if version == SCHEMA_VERSION {
            return Ok(());
        }
        if version != 0 {
            warn!(
                "Schema version {} does not match {}, recreating tables",
                version, SCHEMA_VERSION
            );
        }
        self.recreate_tables().await
    }

    async fn recreate_tables(&self) -> Result<(), DbErr> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        for drop in [
            Table::drop().table(users::Entity).if_exists().to_owned(),
            Table::drop().table(equipment::Entity).if_exists().to_owned(),
        ] {
            self.conn.execute(backend.build(&drop)).await?;
        }

        self.conn
            .execute(backend.build(&schema.create_table_from_entity(Users)))
            .await?;
        self.conn
            .execute(backend.build(&schema.create_table_from_entity(Equipment)))
            .await?;

        self.conn
            .execute_unprepared(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .await?;

        info!("Created database schema version {}", SCHEMA_VERSION);
        Ok(())
    }

    /// Get record counts for all tables.
    pub async fn table_counts(&self) -> Result<TableCounts, DbErr> {
        let users = Users::find().count(&self.conn).await?;
        let equipment = Equipment::find().count(&self.conn).await?;

        Ok(TableCounts { users, equipment })
    }
}

/// Table record counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCounts {
    pub users: u64,
    pub equipment: u64,
}

/// SQLite URL for a database file, created on first connect.
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let storage = Storage::in_memory().await.unwrap();
        assert!(storage.ping().await.is_ok());
        assert_eq!(storage.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert_eq!(storage.table_counts().await.unwrap(), TableCounts { users: 0, equipment: 0 });
    }

    #[tokio::test]
    async fn test_version_mismatch_recreates_tables() {
        let storage = Storage::in_memory().await.unwrap();
        storage
            .conn()
            .execute_unprepared("INSERT INTO users (name, email, password) VALUES ('a', 'a@x.com', 'h')")
            .await
            .unwrap();
        assert_eq!(storage.table_counts().await.unwrap().users, 1);

        storage.conn().execute_unprepared("PRAGMA user_version = 1").await.unwrap();
        storage.ensure_schema().await.unwrap();

        assert_eq!(storage.schema_version().await.unwrap(), SCHEMA_VERSION);
        assert_eq!(storage.table_counts().await.unwrap().users, 0);
    }

    #[tokio::test]
    async fn test_matching_version_keeps_data() {
        let storage = Storage::in_memory().await.unwrap();
        storage
            .conn()
            .execute_unprepared("INSERT INTO users (name, email, password) VALUES ('a', 'a@x.com', 'h')")
            .await
            .unwrap();
        storage.ensure_schema().await.unwrap();
        assert_eq!(storage.table_counts().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("inventory.db"),
            max_connections: 2,
        };

        let storage = Storage::open(&config).await.unwrap();
        assert!(config.path.exists());
        storage.close().await.unwrap();

        let reopened = Storage::open(&config).await.unwrap();
        assert_eq!(reopened.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_sqlite_url() {
        assert_eq!(sqlite_url(Path::new("/tmp/x.db")), "sqlite:///tmp/x.db?mode=rwc");
    }
}
