//! # Session State
//!
//! Who is logged in at this terminal, and for which branch.
//!
//! ```text
//! ┌────────────┐  login   ┌──────────────────────┐  select_branch  ┌──────────────────────┐
//! │ anonymous  │ ───────► │ user, branch of user │ ──────────────► │ user, chosen branch  │
//! └────────────┘          └──────────────────────┘                 └──────────────────────┘
//!       ▲                              │ logout                              │
//!       └──────────────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! Logging out never touches the register; the shift stays open for the
//! next user.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use caja_core::{Branch, CoreError, CoreResult, User};

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub branch: Option<Branch>,
}

/// Shared, mutable session for the running terminal.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<Mutex<Session>>,
}

impl SessionState {
    /// Creates an anonymous session.
    pub fn new() -> Self {
        SessionState::default()
    }

    // Writes are single assignments; a poisoned lock still holds a valid session.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Session) -> R,
    {
        f(&self.lock())
    }

    /// Executes a function with write access to the session.
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        f(&mut self.lock())
    }

    /// Sets the logged-in user and, if known, their branch.
    pub fn sign_in(&self, user: User, branch: Option<Branch>) {
        self.with_session_mut(|s| {
            s.user = Some(user);
            s.branch = branch;
        });
    }

    /// Clears the user and branch. Returns the user that was logged in.
    pub fn sign_out(&self) -> Option<User> {
        self.with_session_mut(|s| {
            s.branch = None;
            s.user.take()
        })
    }

    pub fn set_branch(&self, branch: Branch) {
        self.with_session_mut(|s| s.branch = Some(branch));
    }

    /// The logged-in user, or `NotAuthenticated`.
    pub fn require_user(&self) -> CoreResult<User> {
        self.with_session(|s| s.user.clone())
            .ok_or(CoreError::NotAuthenticated)
    }

    pub fn snapshot(&self) -> Session {
        self.with_session(Session::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::Role;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            username: "Vendedor1".to_string(),
            password: "secret1".to_string(),
            role: Role::Seller,
            branch_id: Some("1".to_string()),
        }
    }

    #[test]
    fn test_anonymous_session_is_rejected() {
        let session = SessionState::new();
        assert!(matches!(session.require_user(), Err(CoreError::NotAuthenticated)));
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = SessionState::new();
        session.sign_in(user(), None);
        assert_eq!(session.require_user().unwrap().id, "u1");

        session.set_branch(Branch {
            id: "2".to_string(),
            name: "Sucursal 2".to_string(),
        });
        assert_eq!(session.snapshot().branch.unwrap().id, "2");

        let previous = session.sign_out().unwrap();
        assert_eq!(previous.username, "Vendedor1");
        assert_eq!(session.snapshot(), Session::default());
    }
}
