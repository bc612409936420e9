//! # Authentication Commands
//!
//! Login, logout, role gate and branch selection.
//!
//! Passwords are compared verbatim against the stored credential. A failed
//! login never says whether the username or the password was wrong.

use tracing::{debug, info, warn};

use caja_core::{Branch, CoreError, Role, User};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Logs a user in and makes them the session's current user.
///
/// The session branch defaults to the user's own branch when the
/// configuration knows it.
pub async fn login(
    db: &DbState,
    config: &ConfigState,
    session: &SessionState,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    debug!(username = %username, "login");

    let user = db.inner().users().find_by_username(username.trim()).await?;

    let user = match user {
        Some(user) if user.password == password => user,
        _ => {
            warn!(username = %username, "Login rejected");
            return Err(CoreError::NotAuthenticated.into());
        }
    };

    let branch = user
        .branch_id
        .as_deref()
        .and_then(|id| config.branch(id))
        .cloned();

    session.sign_in(user.clone(), branch);

    info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(user)
}

/// Clears the current user. The register is left as it is.
pub fn logout(session: &SessionState) -> Option<User> {
    let user = session.sign_out();
    if let Some(user) = &user {
        info!(user_id = %user.id, "User logged out");
    }
    user
}

/// Returns the current user, or `Unauthorized`.
pub fn require_user(session: &SessionState) -> Result<User, ApiError> {
    Ok(session.require_user()?)
}

/// Returns the current user if they are an admin.
///
/// ## Errors
/// * `Unauthorized` - nobody is logged in
/// * `Forbidden` - the user is a seller
pub fn require_admin(session: &SessionState) -> Result<User, ApiError> {
    let user = session.require_user()?;

    if user.role != Role::Admin {
        warn!(user_id = %user.id, "Admin operation refused");
        return Err(CoreError::Forbidden {
            required: Role::Admin.to_string(),
        }
        .into());
    }

    Ok(user)
}

/// Lists the configured branches.
pub fn list_branches(config: &ConfigState) -> Vec<Branch> {
    config.branches.clone()
}

/// Sets the branch the session is working for.
pub fn select_branch(
    config: &ConfigState,
    session: &SessionState,
    branch_id: &str,
) -> Result<Branch, ApiError> {
    session.require_user()?;

    let branch = config
        .branch(branch_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Branch", branch_id))?;

    session.set_branch(branch.clone());
    debug!(branch_id = %branch.id, "Branch selected");

    Ok(branch)
}
