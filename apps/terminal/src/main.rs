//! # Caja Terminal Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main()                                                                 │
//! │    ├── init_tracing()        stderr, RUST_LOG or default filter         │
//! │    ├── Cli::parse()          clap; bad arguments exit with code 2       │
//! │    ├── run(cli).await        one session, one command                   │
//! │    └── print                 text or --json on stdout, errors on stderr │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;

use caja_terminal_lib::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    caja_terminal_lib::init_tracing();

    let cli = Cli::parse();
    let json = cli.json;

    let outcome = caja_terminal_lib::run(cli).await;
    let rendered = outcome.render(json);

    if outcome.success {
        println!("{}", rendered);
        ExitCode::SUCCESS
    } else if json {
        println!("{}", rendered);
        ExitCode::FAILURE
    } else {
        eprintln!("{}", rendered);
        ExitCode::FAILURE
    }
}
