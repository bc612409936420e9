//! # Transaction Repository
//!
//! Read side of posted transactions. Rows are written only by
//! [`crate::LedgerRepository::commit_posting`], together with their stock
//! change and cash movement.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool};
use std::time::Duration;

use crate::error::DbResult;
use crate::pool::timed;
use caja_core::{Money, Payment, PaymentMethod, Quantity, Transaction, TransactionKind};

const TRANSACTION_COLUMNS: &str = "id, type, product_id, quantity_milli, price, total, \
     payment_method, payment_amount, payment_change, date, user_id";

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: TransactionKind,
    product_id: String,
    quantity_milli: Quantity,
    price: Money,
    total: Money,
    payment_method: PaymentMethod,
    payment_amount: Money,
    payment_change: Money,
    date: DateTime<Utc>,
    user_id: String,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.id,
            kind: row.kind,
            product_id: row.product_id,
            quantity: row.quantity_milli,
            price: row.price,
            total: row.total,
            payment: Payment {
                method: row.payment_method,
                amount: row.payment_amount,
                change: row.payment_change,
            },
            date: row.date,
            user_id: row.user_id,
        }
    }
}

/// Inserts one transaction row on any executor (pool or open transaction).
pub(crate) async fn insert_transaction<'e, E>(executor: E, tx: &Transaction) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, type, product_id, quantity_milli, price, total,
            payment_method, payment_amount, payment_change, date, user_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&tx.id)
    .bind(tx.kind)
    .bind(&tx.product_id)
    .bind(tx.quantity)
    .bind(tx.price)
    .bind(tx.total)
    .bind(tx.payment.method)
    .bind(tx.payment.amount)
    .bind(tx.payment.change)
    .bind(tx.date)
    .bind(&tx.user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Repository for reading posted transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        TransactionRepository { pool, timeout }
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        timed(self.timeout, "transactions.get_by_id", async {
            let sql = format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS);
            let row: Option<TransactionRow> = sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Transaction::from))
        })
        .await
    }

    /// Lists transactions with `from <= date < to`, newest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        timed(self.timeout, "transactions.list_between", async {
            let sql = format!(
                "SELECT {} FROM transactions WHERE date >= ?1 AND date < ?2 \
                 ORDER BY date DESC, rowid DESC",
                TRANSACTION_COLUMNS
            );
            let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(Transaction::from).collect())
        })
        .await
    }

    /// Lists every transaction of one product, in posting order.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Transaction>> {
        timed(self.timeout, "transactions.list_for_product", async {
            let sql = format!(
                "SELECT {} FROM transactions WHERE product_id = ?1 ORDER BY rowid",
                TRANSACTION_COLUMNS
            );
            let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
                .bind(product_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(Transaction::from).collect())
        })
        .await
    }

    /// Total number of transactions.
    pub async fn count(&self) -> DbResult<i64> {
        timed(self.timeout, "transactions.count", async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    fn sample(date: DateTime<Utc>) -> Transaction {
        Transaction {
            id: caja_core::types::new_id(),
            kind: TransactionKind::Sell,
            product_id: "p1".to_string(),
            quantity: Quantity::from_milli(1500),
            price: Money::from_pesos(2000),
            total: Money::from_pesos(3000),
            payment: Payment {
                method: PaymentMethod::Tarjeta,
                amount: Money::from_pesos(3000),
                change: Money::zero(),
            },
            date,
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tx = sample(Utc::now());

        insert_transaction(db.pool(), &tx).await.unwrap();

        let loaded = db.transactions().get_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(loaded, tx);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
        assert_eq!(db.transactions().list_for_product("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_between_is_half_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap();

        for d in [1, 2, 3] {
            insert_transaction(db.pool(), &sample(day(d))).await.unwrap();
        }

        let from = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();
        let found = db.transactions().list_between(from, to).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, day(2));
    }

    #[tokio::test]
    async fn test_transactions_are_append_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tx = sample(Utc::now());
        insert_transaction(db.pool(), &tx).await.unwrap();

        let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(&tx.id)
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }
}
