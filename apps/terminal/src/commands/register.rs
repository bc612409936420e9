//! # Register Commands
//!
//! Opening, closing, manual movements and reconciliation of the cash
//! register.
//!
//! ## Posting a Movement
//! ```text
//! lock register ──► check(kind, amount) ──► INSERT movement ──► apply()
//!                        │                        │
//!                        ▼                        ▼
//!                   StateError /            PersistenceError:
//!                   ValidationError         cache untouched
//! ```
//!
//! The cache only changes after the row is durable. A close whose insert
//! fails leaves the register open with its balance unchanged.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use caja_core::validation::{validate_amount, validate_description};
use caja_core::{CashMovement, CashRegister, Money, MovementKind, ValidationError};

use crate::error::ApiError;
use crate::state::{DbState, RegisterState, SessionState};

/// Result of closing the register.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSummary {
    /// The cierre movement, carrying the balance at close.
    pub movement: CashMovement,
    pub register: CashRegister,
}

/// Result of rebuilding the register from the movement log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Cached state before the rebuild.
    pub previous: CashRegister,
    /// State replayed from the log, now cached.
    pub register: CashRegister,
    pub drifted: bool,
    pub movements: usize,
}

// =============================================================================
// Posting
// =============================================================================

/// Gates, persists and applies one movement on an already-locked register.
pub(crate) async fn post_locked(
    db: &DbState,
    register: &mut CashRegister,
    movement: &CashMovement,
) -> Result<(), ApiError> {
    register.check(movement.kind, movement.amount)?;

    db.inner().movements().insert(movement).await?;
    register.apply(movement);

    info!(
        movement_id = %movement.id,
        kind = %movement.kind,
        amount = movement.amount.pesos(),
        balance = register.balance.pesos(),
        "Movement posted"
    );

    Ok(())
}

/// Posts a prepared movement to the ledger.
///
/// ## Returns
/// * `Ok(CashRegister)` - register state after the movement
/// * `Err(ApiError)` - rejected by the gate, or not recorded
pub async fn post_movement(
    db: &DbState,
    register: &RegisterState,
    movement: CashMovement,
) -> Result<CashRegister, ApiError> {
    debug!(kind = %movement.kind, amount = movement.amount.pesos(), "post_movement");

    validate_description(&movement.description)?;

    let mut guard = register.lock().await;
    post_locked(db, &mut guard, &movement).await?;
    Ok(*guard)
}

/// Opens the register with an initial float.
///
/// ## Errors
/// * `Unauthorized` - nobody is logged in
/// * `RegisterState` - the register is already open
pub async fn open_register(
    db: &DbState,
    session: &SessionState,
    register: &RegisterState,
    amount: Money,
    description: &str,
) -> Result<CashRegister, ApiError> {
    debug!(amount = amount.pesos(), "open_register");

    let user = session.require_user()?;
    validate_amount("amount", amount)?;
    validate_description(description)?;

    let movement = CashMovement::new(
        MovementKind::Apertura,
        amount,
        description.trim(),
        user.id,
        Utc::now(),
    );

    let mut guard = register.lock().await;
    post_locked(db, &mut guard, &movement).await?;
    Ok(*guard)
}

/// Closes the register, posting a cierre for the current balance.
///
/// ## Errors
/// * `Unauthorized` - nobody is logged in
/// * `RegisterState` - the register is already closed
/// * persistence errors - the register stays open
pub async fn close_register(
    db: &DbState,
    session: &SessionState,
    register: &RegisterState,
    description: &str,
) -> Result<CloseSummary, ApiError> {
    debug!("close_register");

    let user = session.require_user()?;
    validate_description(description)?;

    let mut guard = register.lock().await;

    let movement = CashMovement::new(
        MovementKind::Cierre,
        guard.closing_amount(),
        description.trim(),
        user.id,
        Utc::now(),
    );

    post_locked(db, &mut guard, &movement).await?;

    Ok(CloseSummary {
        movement,
        register: *guard,
    })
}

/// Records a manual ingreso or egreso from the cash panel.
pub async fn record_cash_movement(
    db: &DbState,
    session: &SessionState,
    register: &RegisterState,
    kind: MovementKind,
    amount: Money,
    description: &str,
) -> Result<CashRegister, ApiError> {
    debug!(kind = %kind, amount = amount.pesos(), "record_cash_movement");

    let user = session.require_user()?;

    if !matches!(kind, MovementKind::Ingreso | MovementKind::Egreso) {
        return Err(ValidationError::NotAllowed {
            field: "kind".to_string(),
            allowed: vec!["ingreso".to_string(), "egreso".to_string()],
        }
        .into());
    }

    validate_amount("amount", amount)?;
    validate_description(description)?;

    let movement = CashMovement::new(kind, amount, description.trim(), user.id, Utc::now());

    let mut guard = register.lock().await;
    post_locked(db, &mut guard, &movement).await?;
    Ok(*guard)
}

/// Current cached balance.
pub async fn get_balance(register: &RegisterState) -> Money {
    register.snapshot().await.balance
}

/// Current cached state.
pub async fn register_status(register: &RegisterState) -> CashRegister {
    register.snapshot().await
}

/// Seeds the cache from the movement log at session start.
pub async fn load_register(db: &DbState, register: &RegisterState) -> Result<CashRegister, ApiError> {
    let mut guard = register.lock().await;

    let log = db.inner().movements().list_chronological().await?;
    *guard = CashRegister::replay(&log);

    debug!(movements = log.len(), balance = guard.balance.pesos(), "Register loaded");
    Ok(*guard)
}

/// Rebuilds the cache from the movement log on demand.
///
/// A cache that disagrees with the log is replaced and the drift is
/// logged.
pub async fn reconcile_register(
    db: &DbState,
    register: &RegisterState,
) -> Result<Reconciliation, ApiError> {
    let mut guard = register.lock().await;

    let log = db.inner().movements().list_chronological().await?;
    let replayed = CashRegister::replay(&log);
    let previous = *guard;
    let drifted = previous != replayed;

    if drifted {
        warn!(
            cached_open = previous.is_open,
            cached_balance = previous.balance.pesos(),
            replayed_open = replayed.is_open,
            replayed_balance = replayed.balance.pesos(),
            "Register cache drifted from the movement log"
        );
    }

    *guard = replayed;
    debug!(movements = log.len(), balance = replayed.balance.pesos(), "Register reconciled");

    Ok(Reconciliation {
        previous,
        register: replayed,
        drifted,
        movements: log.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use caja_core::{Role, User};
    use caja_db::{Database, DbConfig};

    async fn setup() -> (DbState, SessionState, RegisterState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = SessionState::new();
        session.sign_in(
            User {
                id: "u1".to_string(),
                username: "Admin".to_string(),
                password: String::new(),
                role: Role::Admin,
                branch_id: None,
            },
            None,
        );
        (DbState::new(db), session, RegisterState::new())
    }

    #[tokio::test]
    async fn test_open_move_close() {
        let (db, session, register) = setup().await;

        let state = open_register(&db, &session, &register, Money::from_pesos(50000), "turno mañana")
            .await
            .unwrap();
        assert!(state.is_open);
        assert_eq!(state.balance.pesos(), 50000);

        let state = record_cash_movement(
            &db,
            &session,
            &register,
            MovementKind::Egreso,
            Money::from_pesos(10000),
            "retiro",
        )
        .await
        .unwrap();
        assert_eq!(state.balance.pesos(), 40000);

        let summary = close_register(&db, &session, &register, "fin turno").await.unwrap();
        assert_eq!(summary.movement.kind, MovementKind::Cierre);
        assert_eq!(summary.movement.amount.pesos(), 40000);
        assert_eq!(summary.register, CashRegister::closed());

        assert_eq!(db.inner().movements().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_close_then_open_starts_from_new_float() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(1000), "a").await.unwrap();
        close_register(&db, &session, &register, "b").await.unwrap();

        let state = open_register(&db, &session, &register, Money::from_pesos(7000), "c")
            .await
            .unwrap();
        assert!(state.is_open);
        assert_eq!(get_balance(&register).await.pesos(), 7000);
    }

    #[tokio::test]
    async fn test_state_gates() {
        let (db, session, register) = setup().await;

        let err = close_register(&db, &session, &register, "x").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegisterState);

        let err = record_cash_movement(
            &db,
            &session,
            &register,
            MovementKind::Ingreso,
            Money::from_pesos(5),
            "x",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegisterState);

        open_register(&db, &session, &register, Money::from_pesos(100), "a").await.unwrap();
        let err = open_register(&db, &session, &register, Money::from_pesos(100), "b")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegisterState);

        // rejected operations leave no trace in the log
        assert_eq!(db.inner().movements().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manual_movement_rules() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(100), "a").await.unwrap();

        let err = record_cash_movement(
            &db,
            &session,
            &register,
            MovementKind::Apertura,
            Money::from_pesos(5),
            "x",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = record_cash_movement(
            &db,
            &session,
            &register,
            MovementKind::Ingreso,
            Money::from_pesos(5),
            "   ",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_failed_post_leaves_cache_untouched() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(100), "a").await.unwrap();

        let movement = CashMovement::new(MovementKind::Ingreso, Money::from_pesos(5), "x", "u1", Utc::now());
        post_movement(&db, &register, movement.clone()).await.unwrap();

        // same id again: the insert fails
        let err = post_movement(&db, &register, movement).await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("cash_movements"));
        assert_eq!(get_balance(&register).await.pesos(), 105);
    }

    #[tokio::test]
    async fn test_failed_close_keeps_register_open() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(500), "a").await.unwrap();

        db.inner().close().await;

        let err = close_register(&db, &session, &register, "fin").await.unwrap_err();
        assert!(err.is_persistence());

        let state = register_status(&register).await;
        assert!(state.is_open);
        assert_eq!(state.balance.pesos(), 500);
    }

    #[tokio::test]
    async fn test_reconcile_fixes_drift() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(2000), "a").await.unwrap();

        // a cache that missed the apertura
        let fresh = RegisterState::new();
        let reconciliation = reconcile_register(&db, &fresh).await.unwrap();
        assert!(reconciliation.drifted);
        assert_eq!(reconciliation.movements, 1);
        assert_eq!(reconciliation.register.balance.pesos(), 2000);
        assert!(register_status(&fresh).await.is_open);

        let again = reconcile_register(&db, &fresh).await.unwrap();
        assert!(!again.drifted);
    }

    #[tokio::test]
    async fn test_load_register_replays_log() {
        let (db, session, register) = setup().await;
        open_register(&db, &session, &register, Money::from_pesos(300), "a").await.unwrap();
        record_cash_movement(&db, &session, &register, MovementKind::Ingreso, Money::from_pesos(20), "b")
            .await
            .unwrap();

        let restarted = RegisterState::new();
        let state = load_register(&db, &restarted).await.unwrap();
        assert_eq!(state, register_status(&register).await);
        assert_eq!(state.balance.pesos(), 320);
    }

    #[tokio::test]
    async fn test_anonymous_session_cannot_open() {
        let (db, session, register) = setup().await;
        session.sign_out();

        let err = open_register(&db, &session, &register, Money::from_pesos(1), "a")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }
}
