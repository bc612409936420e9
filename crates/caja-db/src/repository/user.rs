//! # User Repository
//!
//! User CRUD. The store itself guarantees that the system never ends up
//! without users or without an admin.
//!
//! ## Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete(id, current_user)            update(id, draft)                  │
//! │     │                                   │                               │
//! │     ├── id == current_user? SelfDeletion│                               │
//! │     ├── only user left?    LastUser     │                               │
//! │     └── only admin left?   LastAdmin    └── demotes only admin? LastAdmin
//! │                                                                         │
//! │  Counts and the write run in one transaction.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::timed;
use caja_core::types::new_id;
use caja_core::{CoreError, Role, User, UserDraft};

const USER_COLUMNS: &str = "id, username, password, role, branch_id";

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: String,
    password: String,
    role: Role,
    branch_id: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password: row.password,
            role: row.role,
            branch_id: row.branch_id,
        }
    }
}

async fn fetch_user(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let row: Option<UserRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(User::from))
}

async fn count_users(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

async fn count_admins(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, password, role, branch_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password)
    .bind(user.role)
    .bind(&user.branch_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
        other => other,
    })?;

    Ok(())
}

fn user_from_draft(id: String, draft: &UserDraft) -> User {
    User {
        id,
        username: draft.username.trim().to_string(),
        password: draft.password.clone(),
        role: draft.role,
        branch_id: draft.branch_id.clone(),
    }
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        UserRepository { pool, timeout }
    }

    /// Lists every user ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        timed(self.timeout, "users.list", async {
            let sql = format!(
                "SELECT {} FROM users ORDER BY username COLLATE NOCASE",
                USER_COLUMNS
            );
            let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        timed(self.timeout, "users.get_by_id", async {
            let mut conn = self.pool.acquire().await?;
            fetch_user(&mut conn, id).await
        })
        .await
    }

    /// Finds a user by exact username (used by login).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        timed(self.timeout, "users.find_by_username", async {
            let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
            let row: Option<UserRow> = sqlx::query_as(&sql)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(User::from))
        })
        .await
    }

    /// Number of users.
    pub async fn count(&self) -> DbResult<i64> {
        timed(self.timeout, "users.count", async {
            let mut conn = self.pool.acquire().await?;
            count_users(&mut conn).await
        })
        .await
    }

    /// Creates a user and returns it with its new ID.
    ///
    /// ## Errors
    /// * `DbError::Duplicate` - username already taken
    pub async fn insert(&self, draft: &UserDraft) -> DbResult<User> {
        let user = user_from_draft(new_id(), draft);

        debug!(id = %user.id, username = %user.username, role = %user.role, "Inserting user");

        timed(self.timeout, "users.insert", async {
            let mut conn = self.pool.acquire().await?;
            insert_user(&mut conn, &user).await
        })
        .await?;

        Ok(user)
    }

    /// Replaces a user's fields.
    ///
    /// ## Errors
    /// * `DbError::Rule(LastAdmin)` - the update would demote the only admin
    /// * `DbError::Rule(UserNotFound)` - no such user
    pub async fn update(&self, id: &str, draft: &UserDraft) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        timed(self.timeout, "users.update", async {
            let mut tx = self.pool.begin().await?;

            let existing = fetch_user(&mut tx, id)
                .await?
                .ok_or_else(|| CoreError::UserNotFound(id.to_string()))?;

            if existing.is_admin() && draft.role != Role::Admin && count_admins(&mut tx).await? <= 1
            {
                return Err(CoreError::LastAdmin.into());
            }

            let user = user_from_draft(id.to_string(), draft);

            sqlx::query(
                r#"
                UPDATE users SET
                    username = ?2,
                    password = ?3,
                    role = ?4,
                    branch_id = ?5
                WHERE id = ?1
                "#,
            )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password)
            .bind(user.role)
            .bind(&user.branch_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
                other => other,
            })?;

            tx.commit().await?;
            Ok(user)
        })
        .await
    }

    /// Deletes a user.
    ///
    /// ## Errors
    /// * `DbError::Rule(SelfDeletion)` - `id` is the logged-in user
    /// * `DbError::Rule(LastUser)` - it is the only user
    /// * `DbError::Rule(LastAdmin)` - it is the only admin
    /// * `DbError::Rule(UserNotFound)` - no such user
    pub async fn delete(&self, id: &str, current_user_id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        if id == current_user_id {
            return Err(CoreError::SelfDeletion.into());
        }

        timed(self.timeout, "users.delete", async {
            let mut tx = self.pool.begin().await?;

            let target = fetch_user(&mut tx, id)
                .await?
                .ok_or_else(|| CoreError::UserNotFound(id.to_string()))?;

            if count_users(&mut tx).await? <= 1 {
                return Err(CoreError::LastUser.into());
            }

            if target.is_admin() && count_admins(&mut tx).await? <= 1 {
                return Err(CoreError::LastAdmin.into());
            }

            sqlx::query("DELETE FROM users WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Inserts `drafts` only if the user table is empty.
    ///
    /// Returns the number of users created (0 when users already exist).
    pub async fn seed_if_empty(&self, drafts: &[UserDraft]) -> DbResult<usize> {
        timed(self.timeout, "users.seed_if_empty", async {
            let mut tx = self.pool.begin().await?;

            if count_users(&mut tx).await? > 0 {
                return Ok(0);
            }

            for draft in drafts {
                insert_user(&mut tx, &user_from_draft(new_id(), draft)).await?;
            }

            tx.commit().await?;
            info!(count = drafts.len(), "Seeded initial users");
            Ok(drafts.len())
        })
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
