//! # Configuration State
//!
//! Stores terminal configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAJA_*`)
//! 2. Defaults (this file)
//!
//! Configuration is read-only after initialization, so no mutex is needed.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use caja_core::{Branch, Money, DEFAULT_PAGE_SIZE, DEFAULT_REPORT_DAYS};

/// Terminal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (shown in the status header)
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency. CLP has none.
    pub currency_decimals: u8,

    /// Branches a session can work for
    pub branches: Vec<Branch>,

    /// Rows per report page
    pub page_size: usize,

    /// Default report window, in days
    pub report_days: i64,

    /// Upper bound for a single database operation, in seconds
    pub operation_timeout_secs: u64,
}

impl Default for ConfigState {
    /// ## Default Values
    /// - Store: "Caja POS"
    /// - Currency: CLP ($, no decimals)
    /// - Branches: "Sucursal 1", "Sucursal 2"
    /// - Reports: 30 days, 10 rows per page
    /// - Operation timeout: 10 s
    fn default() -> Self {
        ConfigState {
            store_name: "Caja POS".to_string(),
            currency_code: "CLP".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 0,
            branches: vec![
                Branch {
                    id: "1".to_string(),
                    name: "Sucursal 1".to_string(),
                },
                Branch {
                    id: "2".to_string(),
                    name: "Sucursal 2".to_string(),
                },
            ],
            page_size: DEFAULT_PAGE_SIZE,
            report_days: DEFAULT_REPORT_DAYS,
            operation_timeout_secs: 10,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CAJA_STORE_NAME`: Override store name
    /// - `CAJA_OP_TIMEOUT_SECS`: Database operation timeout (seconds, > 0)
    /// - `CAJA_PAGE_SIZE`: Report rows per page (> 0)
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = ConfigState::default();

        if let Ok(store_name) = std::env::var("CAJA_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Ok(raw) = std::env::var("CAJA_OP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.operation_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid CAJA_OP_TIMEOUT_SECS"),
            }
        }

        if let Ok(raw) = std::env::var("CAJA_PAGE_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.page_size = size,
                _ => warn!(value = %raw, "Ignoring invalid CAJA_PAGE_SIZE"),
            }
        }

        config
    }

    /// The database operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Looks up a configured branch.
    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// Formats an amount with the configured symbol.
    ///
    /// ## Example
    /// ```rust,ignore
    /// config.format_currency(Money::from_pesos(12345)) // "$12.345"
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        amount.format_clp().replacen('$', &self.currency_symbol, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigState::default();
        assert_eq!(config.currency_code, "CLP");
        assert_eq!(config.currency_decimals, 0);
        assert_eq!(config.branches.len(), 2);
        assert_eq!(config.report_days, 30);
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(Money::from_pesos(12345)), "$12.345");
        assert_eq!(config.format_currency(Money::zero()), "$0");
        assert_eq!(config.format_currency(Money::from_pesos(-5000)), "-$5.000");
    }

    #[test]
    fn test_branch_lookup() {
        let config = ConfigState::default();
        assert_eq!(config.branch("2").map(|b| b.name.as_str()), Some("Sucursal 2"));
        assert!(config.branch("9").is_none());
    }
}
