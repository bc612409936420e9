//! # Command Line Surface
//!
//! Argument parsing for `caja` and the dispatch of one parsed command to
//! the command layer.
//!
//! ```text
//! caja [--db PATH] [--json] --user U --password P <command>
//!   register status | reconcile | open | close | movement
//!   sell | buy --item PRODUCT_ID:QTY[@PRICE]... --method M --tendered N
//!   products list | show | add | update | delete | history
//!   users list | add | update | delete
//!   branches list | select
//!   report [--days N] [--page N]
//! caja [--db PATH] seed
//! ```
//!
//! Every result is rendered either as text for a person at the counter or,
//! with `--json`, as the serialized response.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::error;

use caja_core::{
    CashRegister, Money, MovementKind, PaymentMethod, Product, ProductDraft, Quantity, Role,
    Transaction, TransactionKind, User, UserDraft, ValidationError,
};

use crate::commands::checkout::{CheckoutLine, CheckoutReceipt, CheckoutRequest};
use crate::commands::register::{CloseSummary, Reconciliation};
use crate::commands::reports::Report;
use crate::commands::{auth, catalog, checkout, register, reports, users};
use crate::error::{ApiError, CheckoutFailure};
use crate::state::{AppState, ConfigState};

// =============================================================================
// Arguments
// =============================================================================

/// Caja POS: cash register, checkout and store administration.
#[derive(Debug, Parser)]
#[command(name = "caja", version, about)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "CAJA_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Print the JSON response instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Username to log in with
    #[arg(long, global = true, env = "CAJA_USER")]
    pub user: Option<String>,

    /// Password to log in with
    #[arg(long, global = true, env = "CAJA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the initial users on an empty database
    Seed,

    /// Cash register operations
    Register {
        #[command(subcommand)]
        action: RegisterAction,
    },

    /// Sell products (ingreso)
    Sell(CheckoutArgs),

    /// Buy stock (egreso)
    Buy(CheckoutArgs),

    /// Product catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },

    /// User administration
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Branches
    Branches {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Sales and cash report
    Report {
        /// Days to cover, ending today
        #[arg(long)]
        days: Option<i64>,

        /// Page of the transaction list (1-based)
        #[arg(long)]
        page: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RegisterAction {
    /// Show whether the register is open and its balance
    Status,

    /// Rebuild the balance from the movement log
    Reconcile,

    /// Open the register with an initial float
    Open {
        #[arg(long, value_parser = parse_money)]
        amount: Money,

        #[arg(long)]
        description: String,
    },

    /// Close the register for the current balance
    Close {
        #[arg(long)]
        description: String,
    },

    /// Record a manual ingreso or egreso
    Movement {
        #[arg(long)]
        kind: MovementKind,

        #[arg(long, value_parser = parse_money)]
        amount: Money,

        #[arg(long)]
        description: String,
    },
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Cart line as PRODUCT_ID:QTY or PRODUCT_ID:QTY@PRICE (repeatable)
    #[arg(long = "item", required = true, value_parser = parse_item)]
    pub items: Vec<CheckoutLine>,

    /// efectivo, tarjeta or transferencia
    #[arg(long)]
    pub method: PaymentMethod,

    /// Amount handed over
    #[arg(long, value_parser = parse_money)]
    pub tendered: Money,
}

#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    pub name: String,

    #[arg(long, value_parser = parse_money)]
    pub buy_price: Money,

    #[arg(long, value_parser = parse_money)]
    pub sell_price: Money,

    #[arg(long, value_parser = parse_quantity)]
    pub stock: Quantity,
}

impl From<ProductFields> for ProductDraft {
    fn from(fields: ProductFields) -> Self {
        ProductDraft {
            name: fields.name,
            buy_price: fields.buy_price,
            sell_price: fields.sell_price,
            stock: fields.stock,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ProductAction {
    List,
    Show {
        #[arg(long)]
        id: String,
    },
    Add(ProductFields),
    Update {
        #[arg(long)]
        id: String,

        #[command(flatten)]
        fields: ProductFields,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Transactions posted for a product
    History {
        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct UserFields {
    #[arg(long)]
    pub username: String,

    #[arg(id = "new_password", long = "new-password")]
    pub password: String,

    #[arg(long)]
    pub role: Role,

    #[arg(long)]
    pub branch: Option<String>,
}

impl From<UserFields> for UserDraft {
    fn from(fields: UserFields) -> Self {
        UserDraft {
            username: fields.username,
            password: fields.password,
            role: fields.role,
            branch_id: fields.branch,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum UserAction {
    List,
    Add(UserFields),
    Update {
        #[arg(long)]
        id: String,

        #[command(flatten)]
        fields: UserFields,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum BranchAction {
    List,
    Select {
        #[arg(long)]
        id: String,
    },
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_money(input: &str) -> Result<Money, ValidationError> {
    Money::parse_clp(input)
}

fn parse_quantity(input: &str) -> Result<Quantity, ValidationError> {
    Quantity::parse(input)
}

/// Parses `PRODUCT_ID:QTY[@PRICE]`.
///
/// The last `:` splits id from quantity, so `1,5` and `1.5` both work.
pub fn parse_item(input: &str) -> Result<CheckoutLine, ValidationError> {
    let (product_id, rest) = input
        .rsplit_once(':')
        .ok_or_else(|| ValidationError::invalid_format("item", "expected PRODUCT_ID:QTY[@PRICE]"))?;

    if product_id.trim().is_empty() {
        return Err(ValidationError::required("product id"));
    }

    let (quantity, unit_price) = match rest.split_once('@') {
        Some((quantity, price)) => (quantity, Some(Money::parse_clp(price)?)),
        None => (rest, None),
    };

    Ok(CheckoutLine {
        product_id: product_id.trim().to_string(),
        quantity: Quantity::parse(quantity)?,
        unit_price,
    })
}

// =============================================================================
// Outcome
// =============================================================================

/// What one invocation prints.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub value: serde_json::Value,
    pub text: String,
    pub success: bool,
}

impl Outcome {
    pub fn ok<T: Serialize>(value: &T, text: String) -> Self {
        Outcome {
            value: to_json(value),
            text,
            success: true,
        }
    }

    pub fn failed<T: Serialize>(value: &T, text: String) -> Self {
        Outcome {
            value: to_json(value),
            text,
            success: false,
        }
    }

    /// The text or the pretty-printed JSON.
    pub fn render(&self, json: bool) -> String {
        if json {
            serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.value.to_string())
        } else {
            self.text.clone()
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!("Response serialization failed: {}", e);
        serde_json::Value::Null
    })
}

/// Why a command did not complete.
#[derive(Debug)]
pub enum Failure {
    Api(ApiError),
    Checkout(CheckoutFailure),
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::Api(err)
    }
}

impl Failure {
    pub fn into_outcome(self, config: &ConfigState) -> Outcome {
        match self {
            Failure::Api(err) => {
                let text = format!("error: {}", err.message);
                Outcome::failed(&err, text)
            }
            Failure::Checkout(failure) => {
                let mut text = format!("error: {}", failure.error.message);
                if let Some(line) = failure.failed_line {
                    let _ = write!(text, "\nline {} was not posted", line + 1);
                }
                if !failure.committed.is_empty() {
                    let _ = write!(text, "\nalready posted:\n{}", transaction_table(&failure.committed, config));
                }
                Outcome::failed(&failure, text)
            }
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs one command against a started, logged-in session.
pub async fn dispatch(state: &AppState, command: Command) -> Result<Outcome, Failure> {
    let AppState {
        db,
        config,
        session,
        register: cash,
    } = state;

    let outcome = match command {
        Command::Seed => {
            return Err(ApiError::internal("seed runs without a session").into());
        }

        Command::Register { action } => match action {
            RegisterAction::Status => {
                let status = register::register_status(cash).await;
                Outcome::ok(&status, register_text(&status, config))
            }
            RegisterAction::Reconcile => {
                let result = register::reconcile_register(db, cash).await?;
                Outcome::ok(&result, reconciliation_text(&result, config))
            }
            RegisterAction::Open {
                amount,
                description,
            } => {
                let status = register::open_register(db, session, cash, amount, &description).await?;
                Outcome::ok(&status, register_text(&status, config))
            }
            RegisterAction::Close { description } => {
                let summary = register::close_register(db, session, cash, &description).await?;
                Outcome::ok(&summary, close_text(&summary, config))
            }
            RegisterAction::Movement {
                kind,
                amount,
                description,
            } => {
                let status =
                    register::record_cash_movement(db, session, cash, kind, amount, &description)
                        .await?;
                Outcome::ok(&status, register_text(&status, config))
            }
        },

        Command::Sell(args) => checkout_outcome(state, TransactionKind::Sell, args).await?,
        Command::Buy(args) => checkout_outcome(state, TransactionKind::Buy, args).await?,

        Command::Products { action } => match action {
            ProductAction::List => {
                let products = catalog::list_products(db, session).await?;
                Outcome::ok(&products, product_table(&products, config))
            }
            ProductAction::Show { id } => {
                let product = catalog::get_product(db, session, &id).await?;
                let text = product_table(std::slice::from_ref(&product), config);
                Outcome::ok(&product, text)
            }
            ProductAction::Add(fields) => {
                let product = catalog::create_product(db, session, fields.into()).await?;
                Outcome::ok(&product, format!("created product {} ({})", product.name, product.id))
            }
            ProductAction::Update { id, fields } => {
                let product = catalog::update_product(db, session, &id, fields.into()).await?;
                Outcome::ok(&product, format!("updated product {}", product.name))
            }
            ProductAction::Delete { id } => {
                catalog::delete_product(db, session, &id).await?;
                Outcome::ok(&serde_json::json!({ "deleted": id }), format!("deleted product {}", id))
            }
            ProductAction::History { id } => {
                let history = catalog::product_history(db, session, &id).await?;
                Outcome::ok(&history, transaction_table(&history, config))
            }
        },

        Command::Users { action } => match action {
            UserAction::List => {
                let list = users::list_users(db, session).await?;
                Outcome::ok(&list, user_table(&list))
            }
            UserAction::Add(fields) => {
                let user = users::create_user(db, config, session, fields.into()).await?;
                Outcome::ok(&user, format!("created user {} ({})", user.username, user.id))
            }
            UserAction::Update { id, fields } => {
                let user = users::update_user(db, config, session, &id, fields.into()).await?;
                Outcome::ok(&user, format!("updated user {}", user.username))
            }
            UserAction::Delete { id } => {
                users::delete_user(db, session, &id).await?;
                Outcome::ok(&serde_json::json!({ "deleted": id }), format!("deleted user {}", id))
            }
        },

        Command::Branches { action } => match action {
            BranchAction::List => {
                let branches = auth::list_branches(config);
                let text = branches
                    .iter()
                    .map(|b| format!("{:<4} {}", b.id, b.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                Outcome::ok(&branches, text)
            }
            BranchAction::Select { id } => {
                let branch = auth::select_branch(config, session, &id)?;
                Outcome::ok(&branch, format!("working for {}", branch.name))
            }
        },

        Command::Report { days, page } => {
            let report = reports::report(db, config, session, days, page).await?;
            Outcome::ok(&report, report_text(&report, config))
        }
    };

    Ok(outcome)
}

async fn checkout_outcome(
    state: &AppState,
    kind: TransactionKind,
    args: CheckoutArgs,
) -> Result<Outcome, Failure> {
    let request = CheckoutRequest {
        kind,
        lines: args.items,
        method: args.method,
        tendered: args.tendered,
    };

    let receipt = checkout::record_transaction(&state.db, &state.session, &state.register, request)
        .await
        .map_err(Failure::Checkout)?;

    Ok(Outcome::ok(&receipt, receipt_text(&receipt, &state.config)))
}

// =============================================================================
// Text Rendering
// =============================================================================

fn register_text(status: &CashRegister, config: &ConfigState) -> String {
    let state = if status.is_open { "open" } else { "closed" };
    format!(
        "{}: register {}, balance {}",
        config.store_name,
        state,
        config.format_currency(status.balance)
    )
}

fn reconciliation_text(result: &Reconciliation, config: &ConfigState) -> String {
    let mut text = register_text(&result.register, config);
    let _ = write!(text, "\n{} movements replayed", result.movements);
    if result.drifted {
        let _ = write!(
            text,
            "\ncached balance was {}",
            config.format_currency(result.previous.balance)
        );
    }
    text
}

fn close_text(summary: &CloseSummary, config: &ConfigState) -> String {
    format!(
        "register closed with {}\n{}",
        config.format_currency(summary.movement.amount),
        register_text(&summary.register, config)
    )
}

fn receipt_text(receipt: &CheckoutReceipt, config: &ConfigState) -> String {
    let mut text = transaction_table(&receipt.transactions, config);
    let _ = write!(
        text,
        "\ntotal {}  paid {} ({})",
        config.format_currency(receipt.total),
        config.format_currency(receipt.payment.amount),
        receipt.payment.method
    );
    if !receipt.payment.change.is_zero() {
        let _ = write!(text, "  change {}", config.format_currency(receipt.payment.change));
    }
    let _ = write!(text, "\n{}", register_text(&receipt.register, config));
    text
}

fn transaction_table(transactions: &[Transaction], config: &ConfigState) -> String {
    transactions
        .iter()
        .map(|t| {
            format!(
                "{} {:<4} {:<36} {:>8} x {:>10} = {:>12}",
                t.date.format("%Y-%m-%d %H:%M"),
                t.kind.as_str(),
                t.product_id,
                t.quantity.to_string(),
                config.format_currency(t.price),
                config.format_currency(t.total)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn product_table(products: &[Product], config: &ConfigState) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "{:<36} {:<30} buy {:>10} sell {:>10} stock {:>8}",
                p.id,
                p.name,
                config.format_currency(p.buy_price),
                config.format_currency(p.sell_price),
                p.stock.to_string()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn user_table(list: &[User]) -> String {
    list.iter()
        .map(|u| {
            format!(
                "{:<36} {:<20} {:<6} {}",
                u.id,
                u.username,
                u.role.as_str(),
                u.branch_id.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report_text(report: &Report, config: &ConfigState) -> String {
    let mut text = format!("report {} .. {}\n", report.range.from, report.range.to);

    for day in &report.sales_by_day {
        let _ = writeln!(
            text,
            "{}  sells {:>12}  buys {:>12}",
            day.date,
            config.format_currency(day.sells),
            config.format_currency(day.buys)
        );
    }

    for day in &report.cash_by_day {
        let _ = writeln!(
            text,
            "{}  in {:>12}  out {:>12}",
            day.date,
            config.format_currency(day.income),
            config.format_currency(day.outcome)
        );
    }

    let methods = report
        .payment_methods
        .iter()
        .map(|(method, count)| format!("{} {}", method, count))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(
        text,
        "totals: sells {}, buys {}, in {}, out {}",
        config.format_currency(report.totals.sells),
        config.format_currency(report.totals.buys),
        config.format_currency(report.totals.income),
        config.format_currency(report.totals.outcome)
    );
    let _ = writeln!(text, "payments: {}", methods);
    let _ = write!(
        text,
        "transactions page {}/{} ({} total)\n{}",
        report.transactions.page,
        report.transactions.total_pages,
        report.transactions.total_items,
        transaction_table(&report.transactions.items, config)
    );

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        let line = parse_item("abc:2").unwrap();
        assert_eq!(line.product_id, "abc");
        assert_eq!(line.quantity, Quantity::from_units(2));
        assert_eq!(line.unit_price, None);

        let line = parse_item("abc:1,5@4.500").unwrap();
        assert_eq!(line.quantity, Quantity::from_milli(1500));
        assert_eq!(line.unit_price, Some(Money::from_pesos(4500)));

        assert!(parse_item("abc").is_err());
        assert!(parse_item(":2").is_err());
    }

    #[test]
    fn test_cli_parses_sell() {
        let cli = Cli::try_parse_from([
            "caja",
            "--user",
            "Vendedor1",
            "--password",
            "Vendedor123",
            "sell",
            "--item",
            "p1:2",
            "--item",
            "p2:1@990",
            "--method",
            "efectivo",
            "--tendered",
            "$12.000",
        ])
        .unwrap();

        match cli.command {
            Command::Sell(args) => {
                assert_eq!(args.items.len(), 2);
                assert_eq!(args.method, PaymentMethod::Efectivo);
                assert_eq!(args.tendered, Money::from_pesos(12000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_register_movement() {
        let cli = Cli::try_parse_from([
            "caja",
            "--json",
            "register",
            "movement",
            "--kind",
            "egreso",
            "--amount",
            "10000",
            "--description",
            "retiro",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Command::Register {
                action: RegisterAction::Movement { kind, amount, .. },
            } => {
                assert_eq!(kind, MovementKind::Egreso);
                assert_eq!(amount.pesos(), 10000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_method() {
        let result = Cli::try_parse_from([
            "caja", "buy", "--item", "p1:1", "--method", "cheque", "--tendered", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_outcome_lists_committed_lines() {
        let failure = CheckoutFailure {
            committed: Vec::new(),
            failed_line: Some(0),
            error: ApiError::new(crate::error::ErrorCode::Timeout, "The database did not respond in time"),
        };
        let outcome = Failure::Checkout(failure).into_outcome(&ConfigState::default());
        assert!(!outcome.success);
        assert!(outcome.text.contains("line 1 was not posted"));
        assert_eq!(outcome.value["failedLine"], 0);
        assert_eq!(outcome.value["error"]["code"], "TIMEOUT");
    }
}
