//! Helpers for tests that need a real `PostgreSQL` instance.
//!
//! The unique indexes on users and votes only exist in a migrated database,
//! so concurrency tests run against one instead of `MockDatabase`.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Tables emptied by [`TestDatabase::cleanup`], children first.
const TABLES: [&str; 4] = ["comments", "votes", "policies", "users"];

/// Connection settings, read from `TEST_DB_*` environment variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// `TEST_DB_HOST`.
    pub host: String,
    /// `TEST_DB_PORT`.
    pub port: u16,
    /// `TEST_DB_USER`.
    pub username: String,
    /// `TEST_DB_PASSWORD`.
    pub password: String,
    /// `TEST_DB_NAME`.
    pub database: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "policyai_test"),
            password: env_or("TEST_DB_PASSWORD", "policyai_test"),
            database: env_or("TEST_DB_NAME", "policyai_test"),
        }
    }
}

impl TestDbConfig {
    /// Connection URL for the test database.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A connected, migrated test database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Connect without touching the schema.
    pub async fn with_config(config: &TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        info!(database = %config.database, "Connected to test database");
        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Connect with the default config, apply migrations and empty every
    /// table so each test starts from a blank schema.
    pub async fn migrated() -> Result<Self, DbErr> {
        let db = Self::with_config(&TestDbConfig::default()).await?;
        Migrator::up(db.conn.as_ref(), None).await?;
        db.cleanup().await?;
        Ok(db)
    }

    /// Shared handle for building repositories.
    #[must_use]
    pub fn conn(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Truncate all application tables, resetting their id sequences.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let backend = self.conn.get_database_backend();
        let truncate = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", TABLES.join(", "));
        self.conn
            .execute(Statement::from_string(backend, truncate))
            .await?;
        Ok(())
    }

    /// Count rows in `table`.
    pub async fn count_rows(&self, table: &str) -> Result<i64, DbErr> {
        let backend = self.conn.get_database_backend();
        let row = self
            .conn
            .query_one(Statement::from_string(
                backend,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(table.to_string()))?;
        row.try_get("", "n")
    }
}
