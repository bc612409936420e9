//! # Seed Command
//!
//! Creates the initial accounts on an empty database: one admin and one
//! seller per default branch.

use tracing::info;

use caja_core::{Role, UserDraft};

use crate::error::ApiError;
use crate::state::DbState;

/// (username, password, role, branch)
const INITIAL_USERS: [(&str, &str, Role, Option<&str>); 3] = [
    ("Admin", "Admin123*", Role::Admin, None),
    ("Vendedor1", "Vendedor123", Role::Seller, Some("1")),
    ("Vendedor2", "Vendedor2123", Role::Seller, Some("2")),
];

/// The initial accounts as drafts.
pub fn initial_users() -> Vec<UserDraft> {
    INITIAL_USERS
        .iter()
        .map(|(username, password, role, branch)| UserDraft {
            username: username.to_string(),
            password: password.to_string(),
            role: *role,
            branch_id: branch.map(str::to_string),
        })
        .collect()
}

/// Inserts the initial accounts if there are no users yet.
///
/// Returns how many users were created (0 on an already seeded database).
pub async fn seed_initial_users(db: &DbState) -> Result<usize, ApiError> {
    let created = db.inner().users().seed_if_empty(&initial_users()).await?;

    if created == 0 {
        info!("Users already exist, nothing seeded");
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_seed_runs_once() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());

        assert_eq!(seed_initial_users(&db).await.unwrap(), 3);
        assert_eq!(seed_initial_users(&db).await.unwrap(), 0);

        let admin = db.inner().users().find_by_username("Admin").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.password, "Admin123*");
    }
}
