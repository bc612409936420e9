//! # Checkout Command
//!
//! Posts a sale or purchase cart, one line at a time.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_transaction(request)                                            │
//! │                                                                         │
//! │  1. current user              ──► Unauthorized                          │
//! │  2. lock register; open?      ──► RegisterState                         │
//! │  3. load products, build cart ──► NotFound / ValidationError            │
//! │  4. stock covers every sell   ──► InsufficientStock                     │
//! │  5. settle payment on total   ──► PaymentError                          │
//! │     (nothing posted yet: CheckoutFailure { failed_line: None })        │
//! │                                                                         │
//! │  6. for each line i:                                                    │
//! │       plan_line ─► commit_posting (stock + transaction + movement)      │
//! │                 ─► register.apply(movement)                             │
//! │       on error: stop, CheckoutFailure { committed, failed_line: i }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A 3-line sale produces 3 transactions and 3 ingreso movements. Every
//! line carries the same payment record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use caja_core::posting::{cart_total, check_cart, plan_line, settle_payment};
use caja_core::{
    CartItem, CashRegister, CoreError, Money, Payment, PaymentMethod, Posting, Quantity,
    Transaction, TransactionKind,
};

use crate::error::{ApiError, CheckoutFailure};
use crate::state::{DbState, RegisterState, SessionState};

/// One line as entered at the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: Quantity,
    /// Overrides the catalog price for this line.
    pub unit_price: Option<Money>,
}

/// A cart ready for posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub kind: TransactionKind,
    pub lines: Vec<CheckoutLine>,
    pub method: PaymentMethod,
    pub tendered: Money,
}

/// A fully posted checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub kind: TransactionKind,
    pub transactions: Vec<Transaction>,
    pub total: Money,
    pub payment: Payment,
    pub register: CashRegister,
}

/// Resolves entered lines against the catalog.
///
/// Prices are frozen from the product unless the line overrides them.
pub async fn build_cart(
    db: &DbState,
    kind: TransactionKind,
    lines: &[CheckoutLine],
) -> Result<Vec<CartItem>, ApiError> {
    let products = db.inner().products();
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let product = products
            .get_by_id(&line.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let item = CartItem::from_product(&product, kind, line.quantity);
        items.push(match line.unit_price {
            Some(price) => item.with_unit_price(price),
            None => item,
        });
    }

    Ok(items)
}

/// Checks that the catalog stock covers every sell line.
///
/// Lines for the same product are added up.
async fn check_stock(db: &DbState, items: &[CartItem]) -> Result<(), ApiError> {
    let mut requested: HashMap<&str, Quantity> = HashMap::new();
    for item in items {
        let total = requested.entry(item.product_id.as_str()).or_insert(Quantity::zero());
        *total = total.try_add(item.quantity)?;
    }

    let products = db.inner().products();
    for (product_id, quantity) in requested {
        let product = products
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock.to_string(),
                requested: quantity.to_string(),
            }
            .into());
        }
    }

    Ok(())
}

/// Plans and commits one line. Nothing is applied to the register here.
async fn post_line(
    db: &DbState,
    register: &CashRegister,
    kind: TransactionKind,
    item: &CartItem,
    payment: &Payment,
    user_id: &str,
) -> Result<Posting, ApiError> {
    let posting = plan_line(kind, item, payment, user_id, Utc::now())?;
    register.check(posting.movement.kind, posting.movement.amount)?;
    db.inner().ledger().commit_posting(&posting).await?;
    Ok(posting)
}

/// Posts a checkout.
///
/// ## Returns
/// * `Ok(CheckoutReceipt)` - every line committed
/// * `Err(CheckoutFailure)` - `committed` lists the durable lines and
///   `failed_line` the line that stopped the checkout
pub async fn record_transaction(
    db: &DbState,
    session: &SessionState,
    register: &RegisterState,
    request: CheckoutRequest,
) -> Result<CheckoutReceipt, CheckoutFailure> {
    let kind = request.kind;

    debug!(
        kind = %kind,
        lines = request.lines.len(),
        method = %request.method,
        tendered = request.tendered.pesos(),
        "record_transaction"
    );

    let user = session.require_user().map_err(CheckoutFailure::rejected)?;

    let mut guard = register.lock().await;

    if !guard.is_open {
        return Err(CheckoutFailure::rejected(CoreError::RegisterClosed));
    }

    if request.lines.is_empty() {
        return Err(CheckoutFailure::rejected(CoreError::EmptyCart));
    }

    let items = build_cart(db, kind, &request.lines)
        .await
        .map_err(CheckoutFailure::rejected)?;

    check_cart(&items).map_err(CheckoutFailure::rejected)?;

    if kind == TransactionKind::Sell {
        check_stock(db, &items).await.map_err(CheckoutFailure::rejected)?;
    }

    let total = cart_total(&items).map_err(CheckoutFailure::rejected)?;
    let payment = settle_payment(kind, request.method, request.tendered, total)
        .map_err(CheckoutFailure::rejected)?;

    let mut committed = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match post_line(db, &guard, kind, item, &payment, &user.id).await {
            Ok(posting) => {
                guard.apply(&posting.movement);
                committed.push(posting.transaction);
            }
            Err(error) => {
                warn!(
                    line = index,
                    committed = committed.len(),
                    error = %error,
                    "Checkout stopped"
                );
                return Err(CheckoutFailure {
                    committed,
                    failed_line: Some(index),
                    error,
                });
            }
        }
    }

    info!(
        kind = %kind,
        lines = committed.len(),
        total = total.pesos(),
        change = payment.change.pesos(),
        balance = guard.balance.pesos(),
        "Checkout posted"
    );

    Ok(CheckoutReceipt {
        kind,
        transactions: committed,
        total,
        payment,
        register: *guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::register::open_register;
    use crate::error::ErrorCode;
    use caja_core::{MovementKind, Product, ProductDraft, Role, User};
    use caja_db::{Database, DbConfig};

    struct Fixture {
        db: DbState,
        session: SessionState,
        register: RegisterState,
        pan: Product,
        bebida: Product,
    }

    async fn setup(open: bool) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let pan = db
            .products()
            .insert(&ProductDraft {
                name: "Pan".to_string(),
                buy_price: Money::from_pesos(3000),
                sell_price: Money::from_pesos(5000),
                stock: Quantity::from_units(10),
            })
            .await
            .unwrap();
        let bebida = db
            .products()
            .insert(&ProductDraft {
                name: "Bebida".to_string(),
                buy_price: Money::from_pesos(800),
                sell_price: Money::from_pesos(1500),
                stock: Quantity::from_units(3),
            })
            .await
            .unwrap();

        let session = SessionState::new();
        session.sign_in(
            User {
                id: "u1".to_string(),
                username: "Vendedor1".to_string(),
                password: String::new(),
                role: Role::Seller,
                branch_id: None,
            },
            None,
        );

        let db = DbState::new(db);
        let register = RegisterState::new();
        if open {
            open_register(&db, &session, &register, Money::from_pesos(50000), "turno")
                .await
                .unwrap();
        }

        Fixture {
            db,
            session,
            register,
            pan,
            bebida,
        }
    }

    fn line(product: &Product, units: i64) -> CheckoutLine {
        CheckoutLine {
            product_id: product.id.clone(),
            quantity: Quantity::from_units(units),
            unit_price: None,
        }
    }

    async fn stock_of(f: &Fixture, product: &Product) -> Quantity {
        f.db.inner().products().get_by_id(&product.id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_cash_sale_posts_one_record_per_line() {
        let f = setup(true).await;
        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.pan, 2), line(&f.bebida, 1)],
            method: PaymentMethod::Efectivo,
            tendered: Money::from_pesos(20000),
        };

        let receipt = record_transaction(&f.db, &f.session, &f.register, request).await.unwrap();

        assert_eq!(receipt.transactions.len(), 2);
        assert_eq!(receipt.total.pesos(), 11500);
        assert_eq!(receipt.payment.change.pesos(), 8500);
        assert!(receipt.transactions.iter().all(|t| t.payment == receipt.payment));
        assert_eq!(receipt.register.balance.pesos(), 61500);

        assert_eq!(stock_of(&f, &f.pan).await, Quantity::from_units(8));
        assert_eq!(stock_of(&f, &f.bebida).await, Quantity::from_units(2));

        let log = f.db.inner().movements().list_chronological().await.unwrap();
        let ingresos: Vec<i64> = log
            .iter()
            .filter(|m| m.kind == MovementKind::Ingreso)
            .map(|m| m.amount.pesos())
            .collect();
        assert_eq!(ingresos, vec![10000, 1500]);
    }

    #[tokio::test]
    async fn test_purchase_restocks_and_posts_egreso() {
        let f = setup(true).await;
        let request = CheckoutRequest {
            kind: TransactionKind::Buy,
            lines: vec![line(&f.bebida, 12)],
            method: PaymentMethod::Transferencia,
            tendered: Money::from_pesos(9600),
        };

        let receipt = record_transaction(&f.db, &f.session, &f.register, request).await.unwrap();
        assert_eq!(receipt.total.pesos(), 9600);
        assert_eq!(receipt.register.balance.pesos(), 40400);
        assert_eq!(stock_of(&f, &f.bebida).await, Quantity::from_units(15));
    }

    #[tokio::test]
    async fn test_price_override() {
        let f = setup(true).await;
        let mut discounted = line(&f.pan, 1);
        discounted.unit_price = Some(Money::from_pesos(4000));

        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![discounted],
            method: PaymentMethod::Tarjeta,
            tendered: Money::from_pesos(4000),
        };

        let receipt = record_transaction(&f.db, &f.session, &f.register, request).await.unwrap();
        assert_eq!(receipt.transactions[0].price.pesos(), 4000);
    }

    #[tokio::test]
    async fn test_closed_register_rejects_checkout() {
        let f = setup(false).await;
        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.pan, 1)],
            method: PaymentMethod::Efectivo,
            tendered: Money::from_pesos(5000),
        };

        let failure = record_transaction(&f.db, &f.session, &f.register, request)
            .await
            .unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::RegisterState);
        assert_eq!(failure.failed_line, None);
        assert_eq!(stock_of(&f, &f.pan).await, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_rejections_before_posting() {
        let f = setup(true).await;

        let empty = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![],
            method: PaymentMethod::Efectivo,
            tendered: Money::zero(),
        };
        let failure = record_transaction(&f.db, &f.session, &f.register, empty).await.unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::ValidationError);

        // 2 + 2 bebidas against a stock of 3
        let too_many = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.bebida, 2), line(&f.bebida, 2)],
            method: PaymentMethod::Tarjeta,
            tendered: Money::from_pesos(6000),
        };
        let failure = record_transaction(&f.db, &f.session, &f.register, too_many)
            .await
            .unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::InsufficientStock);

        let short = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.pan, 2)],
            method: PaymentMethod::Efectivo,
            tendered: Money::from_pesos(9999),
        };
        let failure = record_transaction(&f.db, &f.session, &f.register, short).await.unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::PaymentError);

        let mismatch = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.pan, 1)],
            method: PaymentMethod::Tarjeta,
            tendered: Money::from_pesos(6000),
        };
        let failure = record_transaction(&f.db, &f.session, &f.register, mismatch)
            .await
            .unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::PaymentError);

        assert_eq!(f.db.inner().transactions().count().await.unwrap(), 0);
        assert_eq!(f.register.snapshot().await.balance.pesos(), 50000);
    }

    #[tokio::test]
    async fn test_line_failure_stops_checkout_after_earlier_lines_commit() {
        let f = setup(true).await;

        // every transaction row for bebida is refused by the store
        sqlx::query(&format!(
            "CREATE TRIGGER refuse_bebida BEFORE INSERT ON transactions \
             WHEN NEW.product_id = '{}' \
             BEGIN SELECT RAISE(ABORT, 'refused'); END",
            f.bebida.id
        ))
        .execute(f.db.inner().pool())
        .await
        .unwrap();

        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![line(&f.pan, 1), line(&f.bebida, 1), line(&f.pan, 1)],
            method: PaymentMethod::Tarjeta,
            tendered: Money::from_pesos(11500),
        };

        let failure = record_transaction(&f.db, &f.session, &f.register, request)
            .await
            .unwrap_err();

        assert_eq!(failure.failed_line, Some(1));
        assert_eq!(failure.committed.len(), 1);
        assert_eq!(failure.committed[0].product_id, f.pan.id);
        assert!(failure.error.is_persistence());

        // only line 0 reached the store and the cache
        assert_eq!(f.register.snapshot().await.balance.pesos(), 55000);
        assert_eq!(stock_of(&f, &f.pan).await, Quantity::from_units(9));
        assert_eq!(stock_of(&f, &f.bebida).await, Quantity::from_units(3));
        assert_eq!(f.db.inner().transactions().count().await.unwrap(), 1);

        let log = f.db.inner().movements().list_chronological().await.unwrap();
        let kinds: Vec<MovementKind> = log.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MovementKind::Apertura, MovementKind::Ingreso]);
    }

    #[tokio::test]
    async fn test_overflowing_price_override_is_rejected_before_posting() {
        let f = setup(true).await;
        let mut huge = line(&f.pan, 3);
        huge.unit_price = Some(Money::from_pesos(i64::MAX / 2));

        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![huge],
            method: PaymentMethod::Tarjeta,
            tendered: Money::from_pesos(1),
        };

        let failure = record_transaction(&f.db, &f.session, &f.register, request)
            .await
            .unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::ValidationError);
        assert_eq!(failure.failed_line, None);
        assert_eq!(f.db.inner().transactions().count().await.unwrap(), 0);
        assert_eq!(f.register.snapshot().await.balance.pesos(), 50000);
    }

    #[tokio::test]
    async fn test_unknown_product_is_rejected_whole() {
        let f = setup(true).await;
        let request = CheckoutRequest {
            kind: TransactionKind::Sell,
            lines: vec![
                line(&f.pan, 1),
                CheckoutLine {
                    product_id: "missing".to_string(),
                    quantity: Quantity::from_units(1),
                    unit_price: None,
                },
            ],
            method: PaymentMethod::Efectivo,
            tendered: Money::from_pesos(10000),
        };

        let failure = record_transaction(&f.db, &f.session, &f.register, request)
            .await
            .unwrap_err();
        assert_eq!(failure.error.code, ErrorCode::NotFound);
        assert!(failure.committed.is_empty());
        assert_eq!(stock_of(&f, &f.pan).await, Quantity::from_units(10));
    }
}
