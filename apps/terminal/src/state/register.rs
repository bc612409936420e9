//! # Register State
//!
//! The cached projection of the cash register.
//!
//! Every register mutation (open, close, manual movement, checkout) holds
//! the lock from its precondition check until the movement is durable and
//! applied, so the terminal has a single writer. The lock is async because
//! it is held across database calls.
//!
//! The cache is rebuilt from the movement log at session start and on
//! demand; see `commands::register::reconcile_register`.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use caja_core::CashRegister;

/// Shared register cache.
#[derive(Debug, Clone, Default)]
pub struct RegisterState {
    inner: Arc<Mutex<CashRegister>>,
}

impl RegisterState {
    /// A closed register with balance 0.
    pub fn new() -> Self {
        RegisterState::default()
    }

    /// Takes the writer lock.
    pub async fn lock(&self) -> MutexGuard<'_, CashRegister> {
        self.inner.lock().await
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> CashRegister {
        *self.inner.lock().await
    }
}
