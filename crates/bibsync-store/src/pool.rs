//! SQLite pool for the library replica
//!
//! File and in-memory databases are opened through one path: shared connect
//! options (foreign keys on, busy timeout), the embedded schema migration,
//! then a check that the replica tables are in place.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::StoreError;

/// Tables the repository reads and writes
pub const REPLICA_TABLES: [&str; 3] = ["libraries", "collections", "items"];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const FILE_MAX_CONNECTIONS: u32 = 5;

/// Where the replica lives
enum Location<'a> {
    File(&'a Path),
    Memory,
}

impl Location<'_> {
    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory => ":memory:".to_string(),
        }
    }
}

/// Pool of SQLite connections holding the synchronized libraries
///
/// A file database runs in WAL mode with up to five connections. An
/// in-memory database keeps a single connection that is never recycled,
/// since its contents vanish with the connection.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the replica database at `db_path`
    ///
    /// Parent directories are created first.
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` if the directory or connection cannot
    /// be set up, `StoreError::MigrationFailed` if the schema cannot be
    /// applied.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        Self::open(Location::File(db_path)).await
    }

    /// Opens a private in-memory replica
    ///
    /// # Errors
    ///
    /// Same as [`DatabasePool::new`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(Location::Memory).await
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn open(location: Location<'_>) -> Result<Self, StoreError> {
        let options = connect_options(&location)?;

        let pool_options = match location {
            Location::File(_) => SqlitePoolOptions::new().max_connections(FILE_MAX_CONNECTIONS),
            Location::Memory => SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(Option::<Duration>::None)
                .max_lifetime(Option::<Duration>::None),
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            StoreError::ConnectionFailed(format!(
                "Failed to open database {}: {e}",
                location.describe()
            ))
        })?;

        migrate(&pool).await?;

        tracing::info!(database = %location.describe(), "Library store opened");
        Ok(Self { pool })
    }
}

fn connect_options(location: &Location<'_>) -> Result<SqliteConnectOptions, StoreError> {
    let base = match location {
        Location::File(path) => SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal),
        Location::Memory => SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StoreError::ConnectionFailed(format!("Invalid in-memory database URL: {e}"))
        })?,
    };

    // Snapshot rows cascade from their `libraries` row
    Ok(base.foreign_keys(true).busy_timeout(BUSY_TIMEOUT))
}

/// Applies the schema and checks that every replica table exists
async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(include_str!("migrations/20261017_initial.sql"))
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("Failed to apply schema: {e}")))?;

    verify_schema(pool).await?;
    tracing::debug!(tables = ?REPLICA_TABLES, "Schema ready");
    Ok(())
}

async fn verify_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to inspect schema: {e}")))?;

    let missing: Vec<&str> = REPLICA_TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|name| name == table))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::MigrationFailed(format!(
            "Replica tables missing: {}",
            missing.join(", ")
        )))
    }
}
