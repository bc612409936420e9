//! # Caja Terminal Library
//!
//! Session lifecycle and command layer of the Caja POS terminal. The `caja`
//! binary is a thin wrapper around [`run`].
//!
//! ## Module Organization
//! ```text
//! caja_terminal_lib/
//! ├── lib.rs          ◄─── You are here (tracing, database path, session run)
//! ├── cli.rs          ◄─── clap arguments, dispatch, text rendering
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState (one per session)
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── session.rs  ◄─── Current user and branch
//! │   ├── register.rs ◄─── Cached register projection (single writer)
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/
//! │   ├── auth.rs     ◄─── login, logout, role gate, branches
//! │   ├── register.rs ◄─── open, close, movements, reconcile
//! │   ├── checkout.rs ◄─── per-line sale/purchase posting
//! │   ├── catalog.rs  ◄─── products
//! │   ├── users.rs    ◄─── user administration
//! │   ├── reports.rs  ◄─── date-range report
//! │   └── seed.rs     ◄─── initial users
//! └── error.rs        ◄─── ApiError and CheckoutFailure
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use caja_db::{Database, DbConfig};

use cli::{Cli, Command, Failure, Outcome};
use commands::{auth, seed};
use error::ApiError;
use state::{AppState, ConfigState};

/// Runs one invocation of `caja`.
///
/// ## Session Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Resolve database path   --db, CAJA_DB_PATH, platform data dir      │
/// │  2. Connect                 SQLite (WAL), run pending migrations        │
/// │  3. Start session           replay the movement log into the register   │
/// │  4. Log in                  --user / --password                         │
/// │  5. Run the command                                                     │
/// │  6. Shut down               sign out, close the pool                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `caja seed` skips steps 3 and 4.
pub async fn run(cli: Cli) -> Outcome {
    let config = ConfigState::from_env();

    match run_session(cli, &config).await {
        Ok(outcome) => outcome,
        Err(failure) => failure.into_outcome(&config),
    }
}

async fn run_session(cli: Cli, config: &ConfigState) -> Result<Outcome, Failure> {
    let path = database_path(cli.db)?;
    info!(?path, "Database path determined");

    let db = Database::new(DbConfig::new(path).operation_timeout(config.operation_timeout()))
        .await
        .map_err(ApiError::from)?;

    if let Command::Seed = cli.command {
        let created = seed::seed_initial_users(&state::DbState::new(db.clone())).await;
        db.close().await;
        let created = created?;
        return Ok(Outcome::ok(
            &serde_json::json!({ "created": created }),
            format!("{} users created", created),
        ));
    }

    let (state, _) = AppState::start(db, config.clone()).await?;

    let result = match (cli.user.as_deref(), cli.password.as_deref()) {
        (Some(username), Some(password)) => {
            match auth::login(&state.db, &state.config, &state.session, username, password).await {
                Ok(_) => cli::dispatch(&state, cli.command).await,
                Err(err) => Err(err.into()),
            }
        }
        _ => Err(ApiError::validation("--user and --password are required").into()),
    };

    state.shutdown().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caja_db=trace` - Show trace for the storage crate only
/// - Default: `info,caja=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path.
///
/// An explicit path (`--db` or `CAJA_DB_PATH`) wins. Otherwise the
/// platform data directory is used:
/// - **macOS**: `~/Library/Application Support/com.caja.pos/caja.db`
/// - **Windows**: `%APPDATA%\caja\pos\data\caja.db`
/// - **Linux**: `~/.local/share/pos/caja.db`
pub fn database_path(explicit: Option<PathBuf>) -> Result<PathBuf, ApiError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let proj_dirs = ProjectDirs::from("com", "caja", "pos")
        .ok_or_else(|| ApiError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir).map_err(|e| {
        error!("Could not create {}: {}", data_dir.display(), e);
        ApiError::internal("Could not create the data directory")
    })?;

    Ok(data_dir.join("caja.db"))
}
