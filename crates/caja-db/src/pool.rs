//! # Connection Pool
//!
//! Opening the store, pool sizing and the per-operation time limit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  `caja` invocation                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path).operation_timeout(..)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ──► open file (WAL) ──► SqlitePool ──► migrations        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  products()  users()  transactions()  movements()  ledger()             │
//! │       │                                                                 │
//! │       └──► each call wrapped in timed(): Timeout instead of a hang      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! File databases run in WAL mode so report reads never block a checkout.
//! `:memory:` databases (tests) keep SQLite's default journal and a single
//! connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::ledger::LedgerRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::TransactionRepository;
use crate::repository::user::UserRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store.
///
/// ## Example
/// ```rust
/// use caja_db::DbConfig;
/// use std::time::Duration;
///
/// let config = DbConfig::new("/path/to/caja.db")
///     .max_connections(5)
///     .operation_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_connections, 5);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Pool ceiling (default 5). One session rarely needs more than two.
    pub max_connections: u32,

    /// Connections held open while idle (default 1).
    pub min_connections: u32,

    /// How long to wait for a free connection (default 30 s).
    pub connect_timeout: Duration,

    /// Idle connections are dropped after this (default 10 min).
    pub idle_timeout: Duration,

    /// Upper bound for any single repository call.
    /// Default: 10 seconds
    pub operation_timeout: Duration,

    /// Apply pending migrations in [`Database::new`] (default on).
    pub run_migrations: bool,
}

impl DbConfig {
    /// Defaults for the terminal's database file. The file is created on
    /// first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            operation_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Disable to open a database whose schema is managed elsewhere.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Throwaway database for tests.
    ///
    /// Pinned to one connection: each connection to `:memory:` gets its own
    /// empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options.foreign_keys(true))
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Runs a database future, failing with [`DbError::Timeout`] if it does not
/// complete within `limit`.
///
/// Dropping the future on timeout drops any open sqlx transaction with it,
/// which rolls the transaction back.
pub(crate) async fn timed<T, F>(limit: Duration, operation: &str, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, millis, "Database operation timed out");
            Err(DbError::Timeout { millis })
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the store. Cheap to clone; every repository borrows its pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::in_memory()).await?;
/// let products = db.products().list().await?;
/// let log = db.movements().list_chronological().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,

    /// Per-operation time limit handed to every repository.
    operation_timeout: Duration,
}

impl Database {
    /// Opens the store and brings its schema up to date.
    ///
    /// ## Errors
    /// * `ConnectionFailed` - the file cannot be opened or created
    /// * `MigrationFailed` - a pending migration was rejected
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let connect_options = config.connect_options()?;

        debug!(in_memory = config.is_in_memory(), "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            operation_timeout_ms = config.operation_timeout.as_millis() as u64,
            "Database pool created"
        );

        let db = Database {
            pool,
            operation_timeout: config.operation_timeout,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Already applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for migrations and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Catalog.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Accounts.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Returns the transaction repository (read side).
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Returns the cash movement repository.
    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Returns the ledger repository (atomic cart-line commits).
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone(), self.operation_timeout)
    }

    /// Ends the session's access to the store. Later calls fail with
    /// `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
