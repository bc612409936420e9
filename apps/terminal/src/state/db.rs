//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn list_products(
//!     db: &DbState,
//!     session: &SessionState,
//! ) -> Result<Vec<Product>, ApiError> {
//!     session.require_user()?;
//!     Ok(db.inner().products().list().await?)
//! }
//! ```

use caja_db::Database;

/// Wrapper around `Database` owned by one session.
///
/// The pool inside is thread-safe; commands share it without locking.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
