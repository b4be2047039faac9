//! Database pools with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. A `DatabasePool` pairs a
//! multi-connection reader pool for concurrent reads with a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce
//! foreign keys. The durable archive and the ephemeral session store each get
//! their own database file and their own migration set.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use parley_types::config::{DatabaseConfig, EphemeralStoreConfig};

static DURABLE_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/durable");
static EPHEMERAL_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/ephemeral");

/// Durable database file name inside the data directory.
pub const DURABLE_DB_FILE: &str = "parley.db";
/// Ephemeral session database file name inside the data directory.
pub const EPHEMERAL_DB_FILE: &str = "ephemeral.db";

/// Busy timeout for the ephemeral database, which has no config knob of its own.
const EPHEMERAL_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct PoolLimits {
    readers: u32,
    busy_timeout: Duration,
    max_lifetime: Option<Duration>,
}

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: multi-connection pool for concurrent SELECT queries.
/// - `writer`: single-connection pool for serialized INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the durable archive database and run its migrations.
    pub async fn durable(database_url: &str, config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let limits = PoolLimits {
            readers: config.max_connections,
            busy_timeout: config.busy_timeout(),
            max_lifetime: None,
        };
        Self::open(database_url, &limits, &DURABLE_MIGRATIONS).await
    }

    /// Open the ephemeral session database and run its migrations.
    ///
    /// Connections are recycled after `max_connection_age`.
    pub async fn ephemeral(
        database_url: &str,
        config: &EphemeralStoreConfig,
    ) -> Result<Self, sqlx::Error> {
        let limits = PoolLimits {
            readers: config.pool_size,
            busy_timeout: EPHEMERAL_BUSY_TIMEOUT,
            max_lifetime: Some(config.max_connection_age()),
        };
        Self::open(database_url, &limits, &EPHEMERAL_MIGRATIONS).await
    }

    async fn open(
        database_url: &str,
        limits: &PoolLimits,
        migrator: &Migrator,
    ) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(limits.busy_timeout)
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .max_lifetime(limits.max_lifetime)
            .connect_with(write_opts)
            .await?;

        // Run migrations on writer before opening reader pool
        migrator.run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(limits.readers)
            .max_lifetime(limits.max_lifetime)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

/// SQLite URL for `file` inside `data_dir`, creating the file if missing.
pub fn database_url(data_dir: &Path, file: &str) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join(file).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap();
        tables.into_iter().map(|t| t.0).collect()
    }

    #[tokio::test]
    async fn test_durable_pool_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), DURABLE_DB_FILE);

        let pool = DatabasePool::durable(&url, &DatabaseConfig::default())
            .await
            .unwrap();

        let names = table_names(&pool.reader).await;
        for table in ["correspondents", "threads", "messages", "interests", "interest_catalog"] {
            assert!(names.iter().any(|n| n == table), "{table} table missing");
        }
        assert!(!names.iter().any(|n| n == "kv_entries"));
    }

    #[tokio::test]
    async fn test_ephemeral_pool_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), EPHEMERAL_DB_FILE);

        let pool = DatabasePool::ephemeral(&url, &EphemeralStoreConfig::default())
            .await
            .unwrap();

        let names = table_names(&pool.reader).await;
        assert_eq!(names, vec!["activity_index", "kv_entries"]);
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), "test_wal.db");

        let pool = DatabasePool::durable(&url, &DatabaseConfig::default())
            .await
            .unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_pool_foreign_keys_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), "test_fk.db");

        let pool = DatabasePool::durable(&url, &DatabaseConfig::default())
            .await
            .unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_close_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path(), "test_close.db");
        let pool = DatabasePool::durable(&url, &DatabaseConfig::default())
            .await
            .unwrap();
        pool.close().await;
        assert!(pool.writer.is_closed());
        assert!(pool.reader.is_closed());
    }

    #[test]
    fn test_database_url() {
        let url = database_url(Path::new("/tmp/parley"), DURABLE_DB_FILE);
        assert_eq!(url, "sqlite:///tmp/parley/parley.db?mode=rwc");
    }
}
