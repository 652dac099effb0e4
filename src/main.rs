//! Coffer - shared encrypted secrets for small teams.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coffer::cli::{execute, output, Cli};
use coffer::error::Error;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("COFFER_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("coffer=debug")
        } else {
            EnvFilter::new("coffer=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    if let Err(e) = execute(cli) {
        let suggestion = match &e {
            Error::NotInitialized(_) => Some("run: coffer init -i <identity> -C <dir>"),
            Error::NoUsableKey => {
                Some("no local private key is registered; ask a teammate to run: coffer add")
            }
            Error::NoActiveKey => Some("run: coffer init"),
            Error::RotationIncomplete { .. } => {
                Some("the repository is partially rotated; revert it in version control or re-run: coffer rotate")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
