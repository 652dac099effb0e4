//! Command-line interface.

pub mod config;
pub mod identities;
pub mod init;
pub mod key;
pub mod output;
pub mod secrets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::core::pki::AgeKeyring;
use crate::core::Repository;
use crate::error::Result;

/// Coffer - shared encrypted secrets for small teams.
#[derive(Parser)]
#[command(
    name = "coffer",
    about = "Shared encrypted secrets for small teams",
    version
)]
pub struct Cli {
    /// Repository root
    #[arg(short = 'C', long = "repo", global = true, default_value = ".", env = "COFFER_REPO")]
    pub repo: PathBuf,

    /// Keyring directory (defaults to config, then ~/.coffer/keyring)
    #[arg(long, global = true, env = "COFFER_KEYRING")]
    pub keyring: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Bootstrap an empty directory as a secrets repository
    Init {
        /// Initial identity references (name, fingerprint, or public key).
        /// Falls back to `default_identity` from the user config.
        #[arg(short, long = "identity")]
        identity: Vec<String>,
    },

    /// Register an identity so it can decrypt all secrets
    Add {
        /// Identity reference (name, fingerprint, or public key)
        reference: String,
    },

    /// Deregister an identity and rotate the key
    Rm {
        /// Identity reference
        reference: String,
    },

    /// List registered identities
    Users {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rotate the symmetric key and re-encrypt every secret
    Rotate,

    /// Decrypt a secret and print it to stdout
    Get {
        /// Secret name (relative path)
        name: String,
    },

    /// Encrypt and store a secret
    Put {
        /// Secret name (relative path)
        name: String,
        /// Secret payload; read from stdin when omitted
        value: Option<String>,
    },

    /// Remove a secret
    Del {
        /// Secret name
        name: String,
    },

    /// List secret names
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the local keyring
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Inspect or edit the user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Keyring subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Generate a new named identity
    Keygen {
        /// Identity name
        name: String,
    },

    /// Import a teammate's public key (literal key or file path)
    Import {
        /// Public key string or path to a .pub file
        input: String,
    },

    /// Print an identity's public key
    Export {
        /// Identity reference
        reference: String,
    },

    /// List local identities
    List,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Set a configuration value
    Set {
        /// Config key: `keyring` or `default-identity`
        key: String,
        /// New value
        value: String,
    },
}

/// Open the local keyring for this invocation.
fn open_keyring(keyring: Option<&PathBuf>) -> Result<AgeKeyring> {
    let config = Config::load()?;
    let dir = config.keyring_dir(keyring.map(|p| p.as_path()))?;
    Ok(AgeKeyring::open(dir))
}

/// Open the repository at the chosen root.
fn open_repo(repo: &PathBuf, keyring: Option<&PathBuf>) -> Result<Repository<AgeKeyring>> {
    Repository::open(repo.clone(), open_keyring(keyring)?)
}

/// Execute a parsed command.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init { identity } => init::execute(&cli.repo, cli.keyring.as_ref(), &identity),
        Command::Add { reference } => {
            identities::add(&open_repo(&cli.repo, cli.keyring.as_ref())?, &reference)
        }
        Command::Rm { reference } => {
            identities::rm(&open_repo(&cli.repo, cli.keyring.as_ref())?, &reference)
        }
        Command::Users { json } => {
            identities::users(&open_repo(&cli.repo, cli.keyring.as_ref())?, json)
        }
        Command::Rotate => secrets::rotate(&open_repo(&cli.repo, cli.keyring.as_ref())?),
        Command::Get { name } => secrets::get(&open_repo(&cli.repo, cli.keyring.as_ref())?, &name),
        Command::Put { name, value } => secrets::put(
            &open_repo(&cli.repo, cli.keyring.as_ref())?,
            &name,
            value.as_deref(),
        ),
        Command::Del { name } => secrets::del(&open_repo(&cli.repo, cli.keyring.as_ref())?, &name),
        Command::List { json } => secrets::list(&open_repo(&cli.repo, cli.keyring.as_ref())?, json),
        Command::Key { action } => key::execute(&open_keyring(cli.keyring.as_ref())?, action),
        Command::Config { action } => config::execute(action),
    }
}
