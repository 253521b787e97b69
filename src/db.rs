//! Storage handle and the unit-of-work wrapper.
//!
//! [`Database`] is the only owner of the SQLite connection pool. It is built
//! once at startup from a [`DatabaseConfig`], handed to the services that need
//! it, and closed explicitly at shutdown.
//!
//! Every repository call runs through [`Database::unit_of_work`]: a fresh
//! [`Session`] (pooled connection plus open transaction) is acquired, the
//! operation runs against it, and the session is committed on success or
//! rolled back on failure. The connection goes back to the pool on every exit
//! path because the session is dropped when the call returns.

use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::error::AppError;

/// SQL expression producing a fixed-width UTC timestamp with millisecond precision.
pub const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        task_id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_updated ON tasks (user_id, updated_at)",
];

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://tasks.db` or `sqlite::memory:`.
    pub url: String,
    /// Maximum number of pooled connections.
    ///
    /// An in-memory database lives inside a single connection, so it must use 1.
    pub max_connections: u32,
    /// How long a caller waits for a free connection before failing.
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tasks.db".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Rejects pool settings that could never serve a session.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_connections == 0 {
            return Err(AppError::ConfigurationError(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }
        if self.is_in_memory() && self.max_connections > 1 {
            return Err(AppError::ConfigurationError(
                "an in-memory database needs DATABASE_MAX_CONNECTIONS=1".into(),
            ));
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// A private in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 5,
        }
    }
}

/// Explicitly constructed storage handle. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool. The database file is created if it does not exist.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        config.validate()?;
        log::info!(
            "opening database pool (max_connections = {})",
            config.max_connections
        );

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Idle connections are kept forever so an in-memory database is never dropped.
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Creates the `users` and `tasks` tables if they are missing.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        log::info!("database schema ready");
        Ok(())
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        log::info!("database pool closed");
    }

    /// Runs `op` inside its own session.
    ///
    /// Commits when `op` succeeds; a failed commit is returned as an error.
    /// Rolls back when `op` fails and returns the original error unchanged.
    /// No retries are attempted.
    pub async fn unit_of_work<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, AppError>> + Send,
    {
        let mut session = Session::begin(&self.pool).await?;

        match op(&mut session).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    log::error!("rollback failed after {}: {}", err, rollback_err);
                }
                Err(err)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// One open transaction on one pooled connection.
///
/// Only [`Database::unit_of_work`] creates sessions. Dropping a session that
/// was neither committed nor rolled back rolls it back.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    async fn begin(pool: &SqlitePool) -> Result<Self, AppError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Connection to run queries against.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
