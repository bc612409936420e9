//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Command (terminal app)                                                 │
//! │       │                                                                 │
//! │       │  db.ledger().commit_posting(&posting)                           │
//! │       ▼                                                                 │
//! │  LedgerRepository ── one sqlx transaction per cart line:                │
//! │       ├── SELECT stock                                                  │
//! │       ├── UPDATE stock (conditional on the value read)                  │
//! │       ├── INSERT transactions                                           │
//! │       └── INSERT cash_movements                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD
//! - [`user::UserRepository`] - User CRUD with last-user / last-admin guards
//! - [`transaction::TransactionRepository`] - Posted transactions (read side)
//! - [`movement::MovementRepository`] - The cash movement log
//! - [`ledger::LedgerRepository`] - Atomic per-line commits

pub mod ledger;
pub mod movement;
pub mod product;
pub mod transaction;
pub mod user;
