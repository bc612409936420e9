//! # Migrations
//!
//! The schema ships inside the binary (`sqlx::migrate!`) and is brought up
//! to date every time a session opens the store.
//!
//! ```text
//!   001_initial_schema.sql
//!     users           username UNIQUE, role CHECK (admin | seller)
//!     products        stock_milli CHECK (>= 0), prices CHECK (>= 0)
//!     transactions    type CHECK (sell | buy), no UPDATE/DELETE (trigger)
//!     cash_movements  type CHECK (4 kinds), no UPDATE/DELETE (trigger)
//! ```
//!
//! New files go in `migrations/sqlite/` as `NNN_description.sql`. Applied
//! files are never edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent and ordered; each migration runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
