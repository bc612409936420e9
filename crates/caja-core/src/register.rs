//! # Cash Register
//!
//! The single till of the store, modelled as a projection of the cash
//! movement log.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────────────┐    apertura(x)     ┌──────────────────┐         │
//! │   │     Closed       │ ─────────────────► │    Open(b)       │         │
//! │   │   balance = 0    │                    │                  │◄──┐     │
//! │   └──────────────────┘ ◄───────────────── └────────┬─────────┘   │     │
//! │            ▲             cierre(b)                  │  ingreso(+a) │     │
//! │            │                                        └──────────────┘     │
//! │            │                                           egreso(-a)       │
//! │     apertura while Open ──► RegisterAlreadyOpen                         │
//! │     anything else while Closed ──► RegisterClosed                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `check` is the gate run before a movement is persisted; `apply` is the
//! transition run only after the movement is durable. `replay` rebuilds the
//! state from the full log so a cached register can be reconciled.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CashMovement, MovementKind};

/// Open/closed state and running balance of the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashRegister {
    pub is_open: bool,
    pub balance: Money,
}

impl Default for CashRegister {
    fn default() -> Self {
        CashRegister::closed()
    }
}

impl CashRegister {
    /// The state at process start: closed, balance 0.
    pub const fn closed() -> Self {
        CashRegister {
            is_open: false,
            balance: Money::zero(),
        }
    }

    /// Checks whether a movement of `kind` and `amount` may be posted now.
    ///
    /// ## Rules
    /// - apertura requires a closed register
    /// - cierre, ingreso and egreso require an open register
    /// - amounts must be non-negative, except the cierre amount which is
    ///   whatever the balance is at close
    pub fn check(&self, kind: MovementKind, amount: Money) -> CoreResult<()> {
        if kind != MovementKind::Cierre && amount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        match (kind, self.is_open) {
            (MovementKind::Apertura, true) => Err(CoreError::RegisterAlreadyOpen),
            (MovementKind::Apertura, false) => Ok(()),
            (_, false) => Err(CoreError::RegisterClosed),
            (_, true) => Ok(()),
        }
    }

    /// Applies a persisted movement to the state.
    ///
    /// This never fails. Callers gate with [`CashRegister::check`] first.
    pub fn apply(&mut self, movement: &CashMovement) {
        match movement.kind {
            MovementKind::Apertura => {
                self.is_open = true;
                self.balance += movement.amount;
            }
            MovementKind::Ingreso => self.balance += movement.amount,
            MovementKind::Egreso => self.balance -= movement.amount,
            MovementKind::Cierre => *self = CashRegister::closed(),
        }
    }

    /// Rebuilds the register from the chronological movement log.
    ///
    /// The result is the signed sum of the movements since the last
    /// apertura that has no later cierre. Ingreso/egreso rows found while
    /// closed are skipped.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::{CashMovement, CashRegister, Money, MovementKind};
    /// use chrono::Utc;
    ///
    /// let log = vec![
    ///     CashMovement::new(MovementKind::Apertura, Money::from_pesos(50000), "a", "u", Utc::now()),
    ///     CashMovement::new(MovementKind::Egreso, Money::from_pesos(10000), "b", "u", Utc::now()),
    /// ];
    /// let register = CashRegister::replay(&log);
    /// assert_eq!(register.balance, Money::from_pesos(40000));
    /// ```
    pub fn replay<'a, I>(movements: I) -> CashRegister
    where
        I: IntoIterator<Item = &'a CashMovement>,
    {
        movements
            .into_iter()
            .fold(CashRegister::closed(), |mut register, movement| {
                let orphan = !register.is_open
                    && matches!(movement.kind, MovementKind::Ingreso | MovementKind::Egreso);
                if !orphan {
                    register.apply(movement);
                }
                register
            })
    }

    /// Amount recorded on the cierre movement when closing now.
    #[inline]
    pub fn closing_amount(&self) -> Money {
        self.balance
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn movement(kind: MovementKind, pesos: i64) -> CashMovement {
        CashMovement::new(kind, Money::from_pesos(pesos), "test", "u1", Utc::now())
    }

    #[test]
    fn test_balance_is_signed_sum_while_open() {
        let log = vec![
            movement(MovementKind::Apertura, 50000),
            movement(MovementKind::Egreso, 10000),
            movement(MovementKind::Ingreso, 10000),
            movement(MovementKind::Ingreso, 3500),
            movement(MovementKind::Egreso, 700),
        ];

        let mut register = CashRegister::closed();
        for m in &log {
            register.check(m.kind, m.amount).unwrap();
            register.apply(m);
        }

        let signed: Money = log.iter().map(CashMovement::signed_amount).sum();
        assert!(register.is_open);
        assert_eq!(register.balance, signed);
        assert_eq!(register.balance.pesos(), 52800);
    }

    #[test]
    fn test_close_then_open_reseeds_balance() {
        let mut register = CashRegister::closed();
        register.apply(&movement(MovementKind::Apertura, 50000));
        register.apply(&movement(MovementKind::Ingreso, 2000));
        register.apply(&movement(MovementKind::Cierre, 52000));
        assert_eq!(register, CashRegister::closed());

        register.apply(&movement(MovementKind::Apertura, 30000));
        assert!(register.is_open);
        assert_eq!(register.balance.pesos(), 30000);
    }

    #[test]
    fn test_gate_rejects_undefined_transitions() {
        let closed = CashRegister::closed();
        assert!(matches!(
            closed.check(MovementKind::Cierre, Money::zero()),
            Err(CoreError::RegisterClosed)
        ));
        assert!(matches!(
            closed.check(MovementKind::Ingreso, Money::from_pesos(10)),
            Err(CoreError::RegisterClosed)
        ));
        assert!(closed.check(MovementKind::Apertura, Money::zero()).is_ok());

        let open = CashRegister {
            is_open: true,
            balance: Money::from_pesos(1000),
        };
        assert!(matches!(
            open.check(MovementKind::Apertura, Money::from_pesos(5)),
            Err(CoreError::RegisterAlreadyOpen)
        ));
        assert!(open.check(MovementKind::Egreso, Money::from_pesos(5)).is_ok());
    }

    #[test]
    fn test_gate_rejects_negative_amounts() {
        let open = CashRegister {
            is_open: true,
            balance: Money::from_pesos(-500),
        };
        assert!(matches!(
            open.check(MovementKind::Ingreso, Money::from_pesos(-1)),
            Err(CoreError::Validation(_))
        ));
        assert!(open.check(MovementKind::Cierre, open.closing_amount()).is_ok());
    }

    #[test]
    fn test_replay_uses_only_current_session() {
        let log = vec![
            movement(MovementKind::Apertura, 10000),
            movement(MovementKind::Ingreso, 5000),
            movement(MovementKind::Cierre, 15000),
            movement(MovementKind::Ingreso, 999),
            movement(MovementKind::Apertura, 20000),
            movement(MovementKind::Egreso, 1500),
        ];

        let register = CashRegister::replay(&log);
        assert!(register.is_open);
        assert_eq!(register.balance.pesos(), 18500);
    }

    #[test]
    fn test_replay_of_closed_log() {
        let log = vec![
            movement(MovementKind::Apertura, 10000),
            movement(MovementKind::Cierre, 10000),
        ];
        assert_eq!(CashRegister::replay(&log), CashRegister::closed());
        assert_eq!(CashRegister::replay(&Vec::<CashMovement>::new()), CashRegister::closed());
    }
}
