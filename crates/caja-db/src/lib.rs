//! # caja-db
//!
//! The store behind the register: SQLite through sqlx, one repository per
//! table, plus the ledger repository that commits a cart line atomically.
//!
//! ```text
//!   table            repository              written by
//!   ───────────────  ──────────────────────  ─────────────────────────────
//!   products         ProductRepository       catalog admin, ledger (stock)
//!   users            UserRepository          user admin, seed
//!   transactions     TransactionRepository   ledger only (append-only)
//!   cash_movements   MovementRepository      register commands, ledger
//!                    LedgerRepository        one sqlx transaction per line:
//!                                            stock + transaction + movement
//! ```
//!
//! Every call is bounded by `DbConfig::operation_timeout`. A call that
//! runs out of time fails with [`DbError::Timeout`] and, if it was inside a
//! transaction, rolls back.
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("caja.db")).await?;
//! let log = db.movements().list_chronological().await?;
//! let stock = db.ledger().commit_posting(&posting).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::ledger::LedgerRepository;
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
