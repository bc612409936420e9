//! # User Administration Commands
//!
//! Admin only. The store enforces the invariants inside its own
//! transaction:
//! - usernames are unique
//! - at least one user and one admin always remain
//! - nobody deletes their own user

use tracing::{debug, info};

use caja_core::validation::validate_user_draft;
use caja_core::{User, UserDraft};

use crate::commands::auth::require_admin;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Rejects a branch the configuration does not know.
fn check_branch(config: &ConfigState, draft: &UserDraft) -> Result<(), ApiError> {
    match draft.branch_id.as_deref() {
        Some(id) if config.branch(id).is_none() => Err(ApiError::not_found("Branch", id)),
        _ => Ok(()),
    }
}

/// Lists users ordered by username.
pub async fn list_users(db: &DbState, session: &SessionState) -> Result<Vec<User>, ApiError> {
    require_admin(session)?;
    Ok(db.inner().users().list().await?)
}

/// Creates a user.
pub async fn create_user(
    db: &DbState,
    config: &ConfigState,
    session: &SessionState,
    draft: UserDraft,
) -> Result<User, ApiError> {
    debug!(username = %draft.username, role = %draft.role, "create_user");

    require_admin(session)?;
    validate_user_draft(&draft)?;
    check_branch(config, &draft)?;

    let user = db.inner().users().insert(&draft).await?;

    info!(id = %user.id, username = %user.username, "User created");
    Ok(user)
}

/// Replaces a user's fields.
pub async fn update_user(
    db: &DbState,
    config: &ConfigState,
    session: &SessionState,
    id: &str,
    draft: UserDraft,
) -> Result<User, ApiError> {
    debug!(id = %id, "update_user");

    require_admin(session)?;
    validate_user_draft(&draft)?;
    check_branch(config, &draft)?;

    let user = db.inner().users().update(id, &draft).await?;

    info!(id = %user.id, "User updated");
    Ok(user)
}

/// Deletes a user other than the current one.
pub async fn delete_user(db: &DbState, session: &SessionState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_user");

    let current = require_admin(session)?;
    db.inner().users().delete(id, &current.id).await?;

    info!(id = %id, "User deleted");
    Ok(())
}
