//! # Domain Types
//!
//! Plain data records shared by every layer of Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  method         │       │
//! │  │  buy_price      │   │  kind sell|buy  │──►│  amount         │       │
//! │  │  sell_price     │   │  price (frozen) │   │  change         │       │
//! │  │  stock          │   │  total          │   └─────────────────┘       │
//! │  └─────────────────┘   └────────┬────────┘                             │
//! │                                 │ derives exactly one                   │
//! │                                 ▼                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │     User        │◄──│  CashMovement   │  append-only ledger row     │
//! │  │  role           │   │  ingreso/egreso │                             │
//! │  │  branch_id      │   │  apertura/cierre│                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire names (`sell`, `efectivo`, `apertura`, `admin`, ...) match the
//! values stored in the database and shown in reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

/// Generates a fresh entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn not_allowed(field: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Unit cost when restocking.
    pub buy_price: Money,

    /// Unit price when selling.
    pub sell_price: Money,

    /// Units on hand. Never negative after a committed transaction.
    pub stock: Quantity,

    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the catalog price used for a transaction of the given kind.
    #[inline]
    pub fn price_for(&self, kind: TransactionKind) -> Money {
        match kind {
            TransactionKind::Sell => self.sell_price,
            TransactionKind::Buy => self.buy_price,
        }
    }

    /// Checks if `quantity` can be sold from current stock.
    pub fn can_sell(&self, quantity: Quantity) -> bool {
        quantity <= self.stock
    }
}

/// Fields for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub buy_price: Money,
    pub sell_price: Money,
    pub stock: Quantity,
}

// =============================================================================
// Users & Branches
// =============================================================================

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Catalog, users and reports.
    Admin,
    /// Register and checkout only.
    Seller,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "seller" => Ok(Role::Seller),
            _ => Err(not_allowed("role", &["admin", "seller"])),
        }
    }
}

/// A person who can log in to a terminal.
///
/// The password is an opaque credential compared verbatim at login. It is
/// never serialized back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl User {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields for creating or editing a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

/// A store location a user may be affiliated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Payment
// =============================================================================

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash. The only method that can return change.
    Efectivo,
    /// Card on an external terminal.
    Tarjeta,
    /// Bank transfer.
    Transferencia,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Efectivo,
        PaymentMethod::Tarjeta,
        PaymentMethod::Transferencia,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "efectivo",
            PaymentMethod::Tarjeta => "tarjeta",
            PaymentMethod::Transferencia => "transferencia",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => Ok(PaymentMethod::Efectivo),
            "tarjeta" | "card" => Ok(PaymentMethod::Tarjeta),
            "transferencia" | "transfer" => Ok(PaymentMethod::Transferencia),
            _ => Err(not_allowed(
                "payment method",
                &["efectivo", "tarjeta", "transferencia"],
            )),
        }
    }
}

/// Payment attached to a checkout.
///
/// `change` is only ever non-zero for cash sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    /// Amount tendered by the customer (or paid to the supplier).
    pub amount: Money,
    /// Amount returned to the customer.
    pub change: Money,
}

// =============================================================================
// Transaction
// =============================================================================

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Sale to a customer: stock goes down, cash comes in.
    Sell,
    /// Restocking purchase: stock goes up, cash goes out.
    Buy,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sell => "sell",
            TransactionKind::Buy => "buy",
        }
    }

    /// The ledger movement every transaction of this kind produces.
    pub const fn movement_kind(&self) -> MovementKind {
        match self {
            TransactionKind::Sell => MovementKind::Ingreso,
            TransactionKind::Buy => MovementKind::Egreso,
        }
    }

    /// Description written on the derived movement.
    pub const fn movement_description(&self) -> &'static str {
        match self {
            TransactionKind::Sell => crate::SALE_MOVEMENT_DESCRIPTION,
            TransactionKind::Buy => crate::PURCHASE_MOVEMENT_DESCRIPTION,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One posted cart line. Immutable once created.
///
/// Uses the snapshot pattern: `price` is frozen at posting time even if
/// the catalog price changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub product_id: String,
    pub quantity: Quantity,
    /// Unit price at time of transaction.
    pub price: Money,
    /// Line total (price × quantity, or an overridden price × quantity).
    pub total: Money,
    pub payment: Payment,
    pub date: DateTime<Utc>,
    pub user_id: String,
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Type of a cash-ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Inflow (sales, manual deposits).
    Ingreso,
    /// Outflow (purchases, manual withdrawals).
    Egreso,
    /// Opening float of a shift.
    Apertura,
    /// Closing count of a shift; its amount is the balance at close.
    Cierre,
}

impl MovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Ingreso => "ingreso",
            MovementKind::Egreso => "egreso",
            MovementKind::Apertura => "apertura",
            MovementKind::Cierre => "cierre",
        }
    }

    /// +1 for ingreso/apertura, -1 for egreso/cierre.
    pub const fn sign(&self) -> i64 {
        match self {
            MovementKind::Ingreso | MovementKind::Apertura => 1,
            MovementKind::Egreso | MovementKind::Cierre => -1,
        }
    }

    #[inline]
    pub const fn is_inflow(&self) -> bool {
        self.sign() > 0
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ingreso" => Ok(MovementKind::Ingreso),
            "egreso" => Ok(MovementKind::Egreso),
            "apertura" => Ok(MovementKind::Apertura),
            "cierre" => Ok(MovementKind::Cierre),
            _ => Err(not_allowed(
                "movement type",
                &["ingreso", "egreso", "apertura", "cierre"],
            )),
        }
    }
}

/// One entry in the append-only cash ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashMovement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    /// Non-negative; the sign comes from `kind`.
    pub amount: Money,
    pub description: String,
    pub date: DateTime<Utc>,
    /// User who recorded the movement.
    pub user_id: String,
}

impl CashMovement {
    /// Builds a new movement with a fresh id.
    pub fn new(
        kind: MovementKind,
        amount: Money,
        description: impl Into<String>,
        user_id: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        CashMovement {
            id: new_id(),
            kind,
            amount,
            description: description.into(),
            date,
            user_id: user_id.into(),
        }
    }

    /// The amount with its ledger sign applied.
    #[inline]
    pub fn signed_amount(&self) -> Money {
        Money::from_pesos(self.amount.pesos() * self.kind.sign())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_signs() {
        assert_eq!(MovementKind::Ingreso.sign(), 1);
        assert_eq!(MovementKind::Apertura.sign(), 1);
        assert_eq!(MovementKind::Egreso.sign(), -1);
        assert_eq!(MovementKind::Cierre.sign(), -1);
    }

    #[test]
    fn test_transaction_kind_derives_movement() {
        assert_eq!(TransactionKind::Sell.movement_kind(), MovementKind::Ingreso);
        assert_eq!(TransactionKind::Buy.movement_kind(), MovementKind::Egreso);
        assert_eq!(
            TransactionKind::Sell.movement_description(),
            "Venta de productos"
        );
        assert_eq!(
            TransactionKind::Buy.movement_description(),
            "Compra de productos"
        );
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Efectivo".parse::<PaymentMethod>().unwrap(), PaymentMethod::Efectivo);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Tarjeta);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!("egreso".parse::<MovementKind>().unwrap(), MovementKind::Egreso);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_wire_names() {
        let movement = CashMovement::new(
            MovementKind::Apertura,
            Money::from_pesos(50000),
            "turno mañana",
            "u1",
            Utc::now(),
        );
        let json = serde_json::to_value(&movement).unwrap();
        assert_eq!(json["type"], "apertura");
        assert_eq!(json["amount"], 50000);
    }

    #[test]
    fn test_user_password_not_serialized() {
        let user = User {
            id: "1".to_string(),
            username: "Admin".to_string(),
            password: "secret".to_string(),
            role: Role::Admin,
            branch_id: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"admin\""));
    }

    #[test]
    fn test_signed_amount() {
        let out = CashMovement::new(MovementKind::Egreso, Money::from_pesos(10000), "retiro", "u1", Utc::now());
        assert_eq!(out.signed_amount().pesos(), -10000);
    }
}
