//! # Ledger Repository
//!
//! Commits one posted cart line atomically.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. SELECT name, stock_milli FROM products WHERE id = ?               │
//! │         └── missing ──────────────────────────────► ProductNotFound     │
//! │    2. new = apply_stock_change(kind, stock, qty)                        │
//! │         └── sell below zero ──────────────────────► InsufficientStock   │
//! │    3. UPDATE products SET stock_milli = new                             │
//! │       WHERE id = ? AND stock_milli = old                                │
//! │         └── 0 rows (changed underneath) ──────────► TransactionFailed   │
//! │    4. INSERT INTO transactions                                          │
//! │    5. INSERT INTO cash_movements                                        │
//! │  COMMIT   (outside the operation timeout)                               │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: SQLite rolls back, so   │
//! │  stock, transaction and movement are written together or not at all.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1-5 are bounded by the operation timeout; COMMIT is not. A
//! `Timeout` therefore always means the line was rolled back, never that
//! it was committed and reported as failed.

use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::timed;
use crate::repository::movement::insert_movement;
use crate::repository::transaction::insert_transaction;
use caja_core::posting::apply_stock_change;
use caja_core::{CoreError, Posting, Quantity};

#[derive(Debug, FromRow)]
struct StockRow {
    name: String,
    stock_milli: Quantity,
}

/// Repository owning the per-line transactional boundary.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        LedgerRepository { pool, timeout }
    }

    /// Commits the stock change, transaction row and cash movement of one
    /// cart line in a single database transaction.
    ///
    /// ## Returns
    /// * `Ok(stock)` - the product's stock after the line
    /// * `Err(DbError::Rule(..))` - product missing or not enough stock
    /// * `Err(DbError::Timeout)` - steps 1-5 ran out of time; rolled back
    /// * `Err(_)` - persistence failure; nothing was written
    pub async fn commit_posting(&self, posting: &Posting) -> DbResult<Quantity> {
        let tx_record = &posting.transaction;

        debug!(
            transaction_id = %tx_record.id,
            product_id = %tx_record.product_id,
            kind = %tx_record.kind,
            quantity = %tx_record.quantity,
            total = tx_record.total.pesos(),
            "Committing posting"
        );

        let (tx, new_stock) = timed(self.timeout, "ledger.commit_posting", async {
            let mut tx: Transaction<'static, Sqlite> = self.pool.begin().await?;

            let row: StockRow =
                sqlx::query_as("SELECT name, stock_milli FROM products WHERE id = ?1")
                    .bind(&tx_record.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(tx_record.product_id.clone()))?;

            let new_stock = apply_stock_change(
                tx_record.kind,
                &row.name,
                row.stock_milli,
                tx_record.quantity,
            )?;

            let updated = sqlx::query(
                "UPDATE products SET stock_milli = ?1 WHERE id = ?2 AND stock_milli = ?3",
            )
            .bind(new_stock)
            .bind(&tx_record.product_id)
            .bind(row.stock_milli)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() != 1 {
                return Err(DbError::TransactionFailed(format!(
                    "stock of product {} changed during posting",
                    tx_record.product_id
                )));
            }

            insert_transaction(&mut *tx, tx_record).await?;
            insert_movement(&mut *tx, &posting.movement).await?;

            Ok((tx, new_stock))
        })
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %tx_record.id,
            movement_id = %posting.movement.id,
            stock = %new_stock,
            "Posting committed"
        );

        Ok(new_stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::LedgerRepository;
    use crate::{Database, DbConfig, DbError};
    use std::time::Duration;
    use caja_core::posting::{plan_line, settle_payment};
    use caja_core::{
        CartItem, CashMovement, CoreError, Money, MovementKind, PaymentMethod, Posting, Product,
        ProductDraft, Quantity, TransactionKind,
    };
    use chrono::Utc;

    async fn setup(stock: i64) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&ProductDraft {
                name: "Pan amasado".to_string(),
                buy_price: Money::from_pesos(3000),
                sell_price: Money::from_pesos(5000),
                stock: Quantity::from_units(stock),
            })
            .await
            .unwrap();
        (db, product)
    }

    fn posting(kind: TransactionKind, product: &Product, units: i64) -> Posting {
        let item = CartItem::from_product(product, kind, Quantity::from_units(units));
        let total = item.total().unwrap();
        let payment = settle_payment(kind, PaymentMethod::Tarjeta, total, total).unwrap();
        plan_line(kind, &item, &payment, "u1", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_sell_commits_all_three_records() {
        let (db, product) = setup(10).await;
        let p = posting(TransactionKind::Sell, &product, 2);

        let stock = db.ledger().commit_posting(&p).await.unwrap();
        assert_eq!(stock, Quantity::from_units(8));

        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, Quantity::from_units(8));

        let tx = db.transactions().get_by_id(&p.transaction.id).await.unwrap().unwrap();
        assert_eq!(tx.total.pesos(), 10000);

        let log = db.movements().list_chronological().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, MovementKind::Ingreso);
        assert_eq!(log[0].amount.pesos(), 10000);
    }

    #[tokio::test]
    async fn test_buy_restocks_and_posts_egreso() {
        let (db, product) = setup(1).await;
        let p = posting(TransactionKind::Buy, &product, 5);

        let stock = db.ledger().commit_posting(&p).await.unwrap();
        assert_eq!(stock, Quantity::from_units(6));

        let log = db.movements().list_chronological().await.unwrap();
        assert_eq!(log[0].kind, MovementKind::Egreso);
        assert_eq!(log[0].amount.pesos(), 15000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, product) = setup(1).await;
        let p = posting(TransactionKind::Sell, &product, 2);

        let err = db.ledger().commit_posting(&p).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));

        assert_eq!(db.transactions().count().await.unwrap(), 0);
        assert_eq!(db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_movement_rolls_back_stock_and_transaction() {
        let (db, product) = setup(10).await;
        let p = posting(TransactionKind::Sell, &product, 3);

        // occupy the movement id so the last insert of the line fails
        let blocker = CashMovement {
            id: p.movement.id.clone(),
            ..CashMovement::new(MovementKind::Ingreso, Money::from_pesos(1), "x", "u1", Utc::now())
        };
        db.movements().insert(&blocker).await.unwrap();

        let err = db.ledger().commit_posting(&p).await.unwrap_err();
        assert!(err.is_persistence());

        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, Quantity::from_units(10));
        assert_eq!(db.transactions().count().await.unwrap(), 0);
        assert_eq!(db.movements().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, product) = setup(10).await;
        let mut p = posting(TransactionKind::Sell, &product, 1);
        p.transaction.product_id = "gone".to_string();

        let err = db.ledger().commit_posting(&p).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_timeout_never_hides_a_commit() {
        let (db, product) = setup(10).await;
        let p = posting(TransactionKind::Sell, &product, 2);

        let hurried = LedgerRepository::new(db.pool().clone(), Duration::ZERO);
        let result = hurried.commit_posting(&p).await;

        let stock = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        let written = db.transactions().count().await.unwrap();
        let moved = db.movements().count().await.unwrap();

        match result {
            Err(DbError::Timeout { .. }) => {
                assert_eq!(stock, Quantity::from_units(10));
                assert_eq!((written, moved), (0, 0));
            }
            Ok(left) => {
                assert_eq!(left, Quantity::from_units(8));
                assert_eq!(stock, left);
                assert_eq!((written, moved), (1, 1));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
