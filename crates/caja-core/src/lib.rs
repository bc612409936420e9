//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate holds the rules of the cash register and of transaction
//! posting as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    caja (terminal CLI)                          │   │
//! │  │   register open/close ──► sell/buy ──► products/users/report    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ register  │  │  posting  │  │   │
//! │  │   │  Product  │  │   Money   │  │ CashReg.  │  │ CartItem  │  │   │
//! │  │   │ Movement  │  │ Quantity  │  │  replay   │  │ plan_line │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │            ┌───────────┐  ┌───────────┐                        │   │
//! │  │            │ validation│  │  report   │                        │   │
//! │  │            └───────────┘  └───────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, atomic line commits        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, User, Transaction, CashMovement, ...)
//! - [`money`] - Whole-peso Money with es-CL formatting
//! - [`quantity`] - Fractional quantities in milli-units
//! - [`register`] - The cash register state machine and log replay
//! - [`posting`] - Cart lines, payment settlement and per-line posting plans
//! - [`report`] - Date-range grouping for the reports screen
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::{CashRegister, CashMovement, Money, MovementKind};
//! use chrono::Utc;
//!
//! let mut register = CashRegister::closed();
//! let open = CashMovement::new(MovementKind::Apertura, Money::from_pesos(50000), "turno", "u1", Utc::now());
//! register.check(open.kind, open.amount).unwrap();
//! register.apply(&open);
//!
//! assert!(register.is_open);
//! assert_eq!(register.balance.format_clp(), "$50.000");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod posting;
pub mod quantity;
pub mod register;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use posting::{CartItem, Posting};
pub use quantity::Quantity;
pub use register::CashRegister;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum length of a movement description.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Default window of the reports screen, in days.
pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// Default rows per report page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Description of the movement derived from a sale line.
pub const SALE_MOVEMENT_DESCRIPTION: &str = "Venta de productos";

/// Description of the movement derived from a purchase line.
pub const PURCHASE_MOVEMENT_DESCRIPTION: &str = "Compra de productos";
