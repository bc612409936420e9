//! # Product Repository
//!
//! Catalog CRUD. Stock is only changed here by an explicit edit; sales and
//! purchases move stock through [`crate::LedgerRepository`].

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::time::Duration;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::timed;
use caja_core::types::new_id;
use caja_core::{Money, Product, ProductDraft, Quantity};

const PRODUCT_COLUMNS: &str = "id, name, buy_price, sell_price, stock_milli, created_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    buy_price: Money,
    sell_price: Money,
    stock_milli: Quantity,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            buy_price: row.buy_price,
            sell_price: row.sell_price,
            stock: row.stock_milli,
            created_at: row.created_at,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ProductRepository { pool, timeout }
    }

    /// Lists every product ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        timed(self.timeout, "products.list", async {
            let sql = format!(
                "SELECT {} FROM products ORDER BY name COLLATE NOCASE, id",
                PRODUCT_COLUMNS
            );
            let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
            Ok(rows.into_iter().map(Product::from).collect())
        })
        .await
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        timed(self.timeout, "products.get_by_id", async {
            let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
            let row: Option<ProductRow> = sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Product::from))
        })
        .await
    }

    /// Inserts a product and returns it with its new ID.
    pub async fn insert(&self, draft: &ProductDraft) -> DbResult<Product> {
        let product = Product {
            id: new_id(),
            name: draft.name.trim().to_string(),
            buy_price: draft.buy_price,
            sell_price: draft.sell_price,
            stock: draft.stock,
            created_at: Utc::now(),
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        timed(self.timeout, "products.insert", async {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, buy_price, sell_price, stock_milli, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&product.id)
            .bind(&product.name)
            .bind(product.buy_price)
            .bind(product.sell_price)
            .bind(product.stock)
            .bind(product.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await?;

        Ok(product)
    }

    /// Replaces the editable fields of a product.
    pub async fn update(&self, id: &str, draft: &ProductDraft) -> DbResult<()> {
        debug!(id = %id, "Updating product");

        timed(self.timeout, "products.update", async {
            let result = sqlx::query(
                r#"
                UPDATE products SET
                    name = ?2,
                    buy_price = ?3,
                    sell_price = ?4,
                    stock_milli = ?5
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(draft.name.trim())
            .bind(draft.buy_price)
            .bind(draft.sell_price)
            .bind(draft.stock)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Product", id));
            }
            Ok(())
        })
        .await
    }

    /// Deletes a product. Posted transactions keep their product_id.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        timed(self.timeout, "products.delete", async {
            let result = sqlx::query("DELETE FROM products WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Product", id));
            }
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
