//! # Reports
//!
//! Pure aggregation over already-fetched transactions and movements.
//! Nothing here touches storage; the caller loads the rows and renders
//! the result.
//!
//! ```text
//! transactions ──► DateRange::contains ──► sales_by_day          (sells/buys per day)
//!                                     └──► payment_method_counts (efectivo/tarjeta/...)
//! movements    ──► DateRange::contains ──► cash_by_day           (income/outcome per day)
//! ```
//!
//! Days are calendar days in UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{CashMovement, PaymentMethod, Transaction, TransactionKind};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the bounds if given backwards.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        if from <= to {
            DateRange { from, to }
        } else {
            DateRange { from: to, to: from }
        }
    }

    /// The last `days` days ending on `today`, both ends included.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::report::DateRange;
    /// use chrono::NaiveDate;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    /// let range = DateRange::last_days(today, 30);
    /// assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    /// ```
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        let span = days.max(1) - 1;
        DateRange::new(today - Duration::days(span), today)
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from <= day && day <= self.to
    }

    /// Half-open instant bounds `[start of from, start of the day after to)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.from.and_time(NaiveTime::MIN).and_utc();
        let end = (self.to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
        (start, end)
    }
}

/// Sell and buy totals of one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotals {
    pub sells: Money,
    pub buys: Money,
}

/// Cash in and out of one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    /// Ingreso and apertura amounts.
    pub income: Money,
    /// Egreso and cierre amounts.
    pub outcome: Money,
}

/// Groups transaction totals by day and kind.
pub fn sales_by_day(
    transactions: &[Transaction],
    range: DateRange,
) -> BTreeMap<NaiveDate, DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();

    for tx in transactions.iter().filter(|tx| range.contains(tx.date)) {
        let entry = days.entry(tx.date.date_naive()).or_default();
        match tx.kind {
            TransactionKind::Sell => entry.sells += tx.total,
            TransactionKind::Buy => entry.buys += tx.total,
        }
    }

    days
}

/// Counts transactions per payment method.
///
/// Every method is present in the result, with 0 when unused.
pub fn payment_method_counts(
    transactions: &[Transaction],
    range: DateRange,
) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> = PaymentMethod::ALL
        .iter()
        .map(|m| (m.as_str(), 0))
        .collect();

    for tx in transactions.iter().filter(|tx| range.contains(tx.date)) {
        *counts.entry(tx.payment.method.as_str()).or_insert(0) += 1;
    }

    counts
}

/// Groups movement amounts by day into income and outcome.
pub fn cash_by_day(movements: &[CashMovement], range: DateRange) -> BTreeMap<NaiveDate, CashFlow> {
    let mut days: BTreeMap<NaiveDate, CashFlow> = BTreeMap::new();

    for movement in movements.iter().filter(|m| range.contains(m.date)) {
        let entry = days.entry(movement.date.date_naive()).or_default();
        if movement.kind.is_inflow() {
            entry.income += movement.amount;
        } else {
            entry.outcome += movement.amount;
        }
    }

    days
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually returned.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Cuts `items` into pages of `page_size` and returns page `page` (1-based).
///
/// Out-of-range pages are clamped to the nearest valid page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        total_pages,
        total_items,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
