//! # Cash Movement Repository
//!
//! The append-only register ledger.
//!
//! ```text
//! rowid │ type      │ amount │ description
//! ──────┼───────────┼────────┼──────────────────────
//!   1   │ apertura  │ 50000  │ turno mañana
//!   2   │ egreso    │ 10000  │ retiro
//!   3   │ ingreso   │ 10000  │ Venta de productos
//!   4   │ cierre    │ 50000  │ fin turno
//! ```
//!
//! Rows are never updated or deleted (enforced by triggers). The posting
//! order (`rowid`) is the order the register replays them in.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool};
use std::time::Duration;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::timed;
use caja_core::{CashMovement, Money, MovementKind};

const MOVEMENT_COLUMNS: &str = "id, type, amount, description, date, user_id";

#[derive(Debug, FromRow)]
struct MovementRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: MovementKind,
    amount: Money,
    description: String,
    date: DateTime<Utc>,
    user_id: String,
}

impl From<MovementRow> for CashMovement {
    fn from(row: MovementRow) -> Self {
        CashMovement {
            id: row.id,
            kind: row.kind,
            amount: row.amount,
            description: row.description,
            date: row.date,
            user_id: row.user_id,
        }
    }
}

/// Inserts one movement row on any executor (pool or open transaction).
pub(crate) async fn insert_movement<'e, E>(executor: E, movement: &CashMovement) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO cash_movements (id, type, amount, description, date, user_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&movement.id)
    .bind(movement.kind)
    .bind(movement.amount)
    .bind(&movement.description)
    .bind(movement.date)
    .bind(&movement.user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Repository for the cash movement log.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        MovementRepository { pool, timeout }
    }

    /// Appends a movement to the log.
    ///
    /// Returns only once the row is durable; on error nothing was written.
    pub async fn insert(&self, movement: &CashMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            kind = %movement.kind,
            amount = movement.amount.pesos(),
            "Inserting cash movement"
        );

        timed(
            self.timeout,
            "movements.insert",
            insert_movement(&self.pool, movement),
        )
        .await
    }

    /// Returns the whole log in posting order.
    pub async fn list_chronological(&self) -> DbResult<Vec<CashMovement>> {
        timed(self.timeout, "movements.list_chronological", async {
            let sql = format!("SELECT {} FROM cash_movements ORDER BY rowid", MOVEMENT_COLUMNS);
            let rows: Vec<MovementRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
            Ok(rows.into_iter().map(CashMovement::from).collect())
        })
        .await
    }

    /// Lists movements with `from <= date < to`, newest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<CashMovement>> {
        timed(self.timeout, "movements.list_between", async {
            let sql = format!(
                "SELECT {} FROM cash_movements WHERE date >= ?1 AND date < ?2 \
                 ORDER BY date DESC, rowid DESC",
                MOVEMENT_COLUMNS
            );
            let rows: Vec<MovementRow> = sqlx::query_as(&sql)
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(CashMovement::from).collect())
        })
        .await
    }

    /// Total number of movements.
    pub async fn count(&self) -> DbResult<i64> {
        timed(self.timeout, "movements.count", async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cash_movements")
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        })
        .await
    }
}
