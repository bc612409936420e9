//! # Commands Module
//!
//! Every operation a terminal session can run.
//!
//! ## Command Categories
//!
//! | Module     | Commands                                               | Role   |
//! |------------|--------------------------------------------------------|--------|
//! | `auth`     | login, logout, require_admin, select_branch            | any    |
//! | `register` | open, close, manual movement, balance, reconcile       | any    |
//! | `checkout` | record_transaction (sell / buy)                        | any    |
//! | `catalog`  | list, get, create, update, delete, history             | admin* |
//! | `users`    | list, create, update, delete                           | admin  |
//! | `reports`  | report                                                 | admin  |
//! | `seed`     | seed_initial_users                                     | none   |
//!
//! \* listing and reading the catalog is open to sellers.
//!
//! ## Error Handling
//! All commands return `Result<T, ApiError>`, except checkout which returns
//! `CheckoutFailure` so the caller learns which lines were committed.

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod register;
pub mod reports;
pub mod seed;
pub mod users;
