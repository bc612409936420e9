//! # Reports Command
//!
//! Admin-only summary of the last N days.
//!
//! ```text
//! DateRange::last_days(today, N)
//!      │ bounds()
//!      ▼
//! transactions.list_between ──► sales_by_day, payment_method_counts, paginate
//! movements.list_between    ──► cash_by_day
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use caja_core::report::{
    cash_by_day, paginate, payment_method_counts, sales_by_day, DateRange, Page,
};
use caja_core::{Money, Transaction, ValidationError};

use crate::commands::auth::require_admin;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Longest window a report may cover.
const MAX_REPORT_DAYS: i64 = 366;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySales {
    pub date: NaiveDate,
    pub sells: Money,
    pub buys: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCash {
    pub date: NaiveDate,
    pub income: Money,
    pub outcome: Money,
}

/// Sums over the whole range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub sells: Money,
    pub buys: Money,
    pub income: Money,
    pub outcome: Money,
}

/// Everything the reports screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub range: DateRange,
    pub sales_by_day: Vec<DaySales>,
    pub payment_methods: BTreeMap<&'static str, usize>,
    pub cash_by_day: Vec<DayCash>,
    pub totals: ReportTotals,
    /// Newest first.
    pub transactions: Page<Transaction>,
}

/// Builds the report for the last `days` days (default from config).
///
/// ## Errors
/// * `Forbidden` - the user is not an admin
/// * `ValidationError` - `days` outside 1..=366
pub async fn report(
    db: &DbState,
    config: &ConfigState,
    session: &SessionState,
    days: Option<i64>,
    page: Option<usize>,
) -> Result<Report, ApiError> {
    require_admin(session)?;

    let days = days.unwrap_or(config.report_days);
    if !(1..=MAX_REPORT_DAYS).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: MAX_REPORT_DAYS,
        }
        .into());
    }

    let range = DateRange::last_days(Utc::now().date_naive(), days);
    let (from, to) = range.bounds();

    debug!(from = %range.from, to = %range.to, "report");

    let transactions = db.inner().transactions().list_between(from, to).await?;
    let movements = db.inner().movements().list_between(from, to).await?;

    let sales: Vec<DaySales> = sales_by_day(&transactions, range)
        .into_iter()
        .map(|(date, t)| DaySales {
            date,
            sells: t.sells,
            buys: t.buys,
        })
        .collect();

    let cash: Vec<DayCash> = cash_by_day(&movements, range)
        .into_iter()
        .map(|(date, f)| DayCash {
            date,
            income: f.income,
            outcome: f.outcome,
        })
        .collect();

    let mut totals = ReportTotals::default();
    for day in &sales {
        totals.sells += day.sells;
        totals.buys += day.buys;
    }
    for day in &cash {
        totals.income += day.income;
        totals.outcome += day.outcome;
    }

    Ok(Report {
        range,
        sales_by_day: sales,
        payment_methods: payment_method_counts(&transactions, range),
        cash_by_day: cash,
        totals,
        transactions: paginate(&transactions, page.unwrap_or(1), config.page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::checkout::{record_transaction, CheckoutLine, CheckoutRequest};
    use crate::commands::register::open_register;
    use crate::error::ErrorCode;
    use crate::state::RegisterState;
    use caja_core::{PaymentMethod, ProductDraft, Quantity, Role, TransactionKind, User};
    use caja_db::{Database, DbConfig};

    async fn setup() -> (DbState, ConfigState, SessionState) {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
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

        let product = db
            .inner()
            .products()
            .insert(&ProductDraft {
                name: "Queso".to_string(),
                buy_price: Money::from_pesos(2000),
                sell_price: Money::from_pesos(3500),
                stock: Quantity::from_units(50),
            })
            .await
            .unwrap();

        let register = RegisterState::new();
        open_register(&db, &session, &register, Money::from_pesos(10000), "turno")
            .await
            .unwrap();

        for (units, method) in [(1, PaymentMethod::Efectivo), (2, PaymentMethod::Tarjeta), (1, PaymentMethod::Tarjeta)] {
            let total = Money::from_pesos(3500 * units);
            let request = CheckoutRequest {
                kind: TransactionKind::Sell,
                lines: vec![CheckoutLine {
                    product_id: product.id.clone(),
                    quantity: Quantity::from_units(units),
                    unit_price: None,
                }],
                method,
                tendered: total,
            };
            record_transaction(&db, &session, &register, request).await.unwrap();
        }

        let mut config = ConfigState::default();
        config.page_size = 2;
        (db, config, session)
    }

    #[tokio::test]
    async fn test_report_aggregates_recent_activity() {
        let (db, config, session) = setup().await;

        let report = report(&db, &config, &session, None, None).await.unwrap();

        assert_eq!(report.totals.sells.pesos(), 14000);
        assert_eq!(report.totals.buys.pesos(), 0);
        assert_eq!(report.totals.income.pesos(), 24000);
        assert_eq!(report.sales_by_day.len(), 1);

        assert_eq!(report.payment_methods["efectivo"], 1);
        assert_eq!(report.payment_methods["tarjeta"], 2);
        assert_eq!(report.payment_methods["transferencia"], 0);

        assert_eq!(report.transactions.total_items, 3);
        assert_eq!(report.transactions.total_pages, 2);
        assert_eq!(report.transactions.items.len(), 2);
    }

    #[tokio::test]
    async fn test_report_second_page() {
        let (db, config, session) = setup().await;
        let report = report(&db, &config, &session, Some(7), Some(2)).await.unwrap();
        assert_eq!(report.transactions.page, 2);
        assert_eq!(report.transactions.items.len(), 1);
    }

    #[tokio::test]
    async fn test_report_rules() {
        let (db, config, session) = setup().await;

        let err = report(&db, &config, &session, Some(0), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        session.with_session_mut(|s| {
            if let Some(user) = s.user.as_mut() {
                user.role = Role::Seller;
            }
        });
        let err = report(&db, &config, &session, None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
