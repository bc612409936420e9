//! # Posting Module
//!
//! Turns a checkout into per-line postings.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cart: [Pan ×2, Leche ×1, Queso ×0,5]      payment: efectivo 12.000     │
//! │           │                                         │                   │
//! │           │                       settle_payment(kind, method, T, total)│
//! │           │                                         │                   │
//! │           ▼                                         ▼                   │
//! │   plan_line(line 0) ──► Posting { Transaction, CashMovement(ingreso) }  │
//! │   plan_line(line 1) ──► Posting { Transaction, CashMovement(ingreso) }  │
//! │   plan_line(line 2) ──► Posting { Transaction, CashMovement(ingreso) }  │
//! │                                                                         │
//! │  One Transaction and one CashMovement per line, never one aggregate.    │
//! │  Each Posting is committed atomically together with its stock change.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{out_of_range, Money};
use crate::quantity::Quantity;
use crate::types::{
    new_id, CashMovement, Payment, PaymentMethod, Product, Transaction, TransactionKind,
};
use crate::validation::{validate_amount, validate_quantity};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Cart Item
// =============================================================================

/// One line of a checkout.
///
/// The unit price is frozen from the catalog when the line is created and
/// may be overridden by the cashier before posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Identifier of the line within the cart.
    pub cart_id: String,
    pub product_id: String,
    /// Product name at time of adding (frozen)
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl CartItem {
    /// Creates a line from a product, at its catalog price for `kind`.
    pub fn from_product(product: &Product, kind: TransactionKind, quantity: Quantity) -> Self {
        CartItem {
            cart_id: new_id(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price_for(kind),
            quantity,
        }
    }

    /// Replaces the frozen unit price.
    pub fn with_unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Line total: unit price × quantity, rounded to a whole peso.
    ///
    /// `OutOfRange` when the total does not fit.
    #[inline]
    pub fn total(&self) -> Result<Money, ValidationError> {
        self.unit_price.times(self.quantity)
    }
}

/// Sum of the line totals. `OutOfRange` if any line or the sum overflows.
pub fn cart_total(items: &[CartItem]) -> Result<Money, ValidationError> {
    items.iter().try_fold(Money::zero(), |sum, item| {
        sum.checked_add(item.total()?)
            .ok_or_else(|| out_of_range("total"))
    })
}

/// Checks the shape of a cart before anything is posted.
pub fn check_cart(items: &[CartItem]) -> CoreResult<()> {
    if items.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if items.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    for item in items {
        validate_quantity(item.quantity)?;
        validate_amount("price", item.unit_price)?;
    }

    cart_total(items)?;

    Ok(())
}

// =============================================================================
// Payment Settlement
// =============================================================================

/// Builds the payment for a checkout, enforcing the tender rules.
///
/// ## Rules
/// ```text
/// ┌──────────────────────┬──────────────────────┬─────────────────────────┐
/// │ kind / method        │ accepted when        │ change                  │
/// ├──────────────────────┼──────────────────────┼─────────────────────────┤
/// │ sell + efectivo      │ tendered >= total    │ tendered - total        │
/// │ anything else        │ tendered == total    │ 0                       │
/// └──────────────────────┴──────────────────────┴─────────────────────────┘
/// ```
///
/// ## Example
/// ```rust
/// use caja_core::posting::settle_payment;
/// use caja_core::{Money, PaymentMethod, TransactionKind};
///
/// let payment = settle_payment(
///     TransactionKind::Sell,
///     PaymentMethod::Efectivo,
///     Money::from_pesos(12000),
///     Money::from_pesos(10000),
/// ).unwrap();
/// assert_eq!(payment.change, Money::from_pesos(2000));
/// ```
pub fn settle_payment(
    kind: TransactionKind,
    method: PaymentMethod,
    tendered: Money,
    total: Money,
) -> Result<Payment, ValidationError> {
    validate_amount("tendered amount", tendered)?;

    let cash_sale = kind == TransactionKind::Sell && method == PaymentMethod::Efectivo;

    if cash_sale {
        if tendered < total {
            return Err(ValidationError::InsufficientTender {
                tendered: tendered.format_clp(),
                total: total.format_clp(),
            });
        }

        return Ok(Payment {
            method,
            amount: tendered,
            change: tendered - total,
        });
    }

    if tendered != total {
        return Err(ValidationError::PaymentMismatch {
            tendered: tendered.format_clp(),
            total: total.format_clp(),
        });
    }

    Ok(Payment {
        method,
        amount: tendered,
        change: Money::zero(),
    })
}

// =============================================================================
// Line Planning
// =============================================================================

/// The records one cart line produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub transaction: Transaction,
    pub movement: CashMovement,
}

/// Plans the transaction and the derived cash movement for one line.
///
/// The movement is an ingreso for sells and an egreso for buys, for the
/// line total, with the standard description.
pub fn plan_line(
    kind: TransactionKind,
    item: &CartItem,
    payment: &Payment,
    user_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<Posting> {
    validate_quantity(item.quantity)?;

    let total = item.total()?;

    let transaction = Transaction {
        id: new_id(),
        kind,
        product_id: item.product_id.clone(),
        quantity: item.quantity,
        price: item.unit_price,
        total,
        payment: *payment,
        date: now,
        user_id: user_id.to_string(),
    };

    let movement = CashMovement::new(
        kind.movement_kind(),
        total,
        kind.movement_description(),
        user_id,
        now,
    );

    Ok(Posting {
        transaction,
        movement,
    })
}

/// Computes the stock left after a line is posted.
///
/// Sells subtract and may not go below zero. Buys restock.
pub fn apply_stock_change(
    kind: TransactionKind,
    product_name: &str,
    stock: Quantity,
    quantity: Quantity,
) -> CoreResult<Quantity> {
    match kind {
        TransactionKind::Sell => {
            if quantity > stock {
                return Err(CoreError::InsufficientStock {
                    product: product_name.to_string(),
                    available: stock.to_string(),
                    requested: quantity.to_string(),
                });
            }
            Ok(stock - quantity)
        }
        TransactionKind::Buy => Ok(stock.try_add(quantity)?),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
