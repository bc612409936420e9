//! # State Module
//!
//! Application state for one terminal session.
//!
//! Separate state types keep each command's signature honest about what
//! it touches: a catalog listing needs the database and the session, a
//! checkout also needs the register.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  AppState (one per session)                     │   │
//! │  │  AppState::start(db, config)  ...  AppState::shutdown()         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │      ┌──────────────┬────────┴───────┬──────────────────┐              │
//! │      ▼              ▼                ▼                  ▼               │
//! │  ┌──────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
//! │  │ DbState  │  │ SessionState │  │RegisterState │  │ ConfigState  │    │
//! │  │          │  │              │  │              │  │              │    │
//! │  │ Database │  │ Arc<Mutex<   │  │ Arc<tokio::  │  │ store_name   │    │
//! │  │ (SQLite  │  │   Session    │  │  Mutex<Cash  │  │ currency     │    │
//! │  │  pool)   │  │ >>           │  │  Register>>  │  │ branches     │    │
//! │  └──────────┘  └──────────────┘  └──────────────┘  └──────────────┘    │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: connection pool (thread-safe)                              │
//! │  • SessionState: short std mutex sections, never held across await     │
//! │  • RegisterState: async mutex held for a whole register mutation       │
//! │  • ConfigState: read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod register;
mod session;

pub use config::ConfigState;
pub use db::DbState;
pub use register::RegisterState;
pub use session::{Session, SessionState};

use tracing::info;

use caja_core::CashRegister;
use caja_db::Database;

use crate::commands::register::load_register;
use crate::error::ApiError;

/// Everything one session owns.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DbState,
    pub config: ConfigState,
    pub session: SessionState,
    pub register: RegisterState,
}

impl AppState {
    /// Wraps an open database with an anonymous session and a closed
    /// register cache.
    pub fn new(db: Database, config: ConfigState) -> Self {
        AppState {
            db: DbState::new(db),
            config,
            session: SessionState::new(),
            register: RegisterState::new(),
        }
    }

    /// Creates the state and rebuilds the register from the movement log.
    pub async fn start(db: Database, config: ConfigState) -> Result<(Self, CashRegister), ApiError> {
        let state = AppState::new(db, config);
        let register = load_register(&state.db, &state.register).await?;

        info!(
            is_open = register.is_open,
            balance = register.balance.pesos(),
            "Session started"
        );

        Ok((state, register))
    }

    /// Ends the session and closes the pool.
    pub async fn shutdown(self) {
        self.session.sign_out();
        self.db.inner().close().await;
        info!("Session ended");
    }
}
