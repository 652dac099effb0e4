//! `coffer add` / `rm` / `users` - identity management.

use super::output;
use crate::core::pki::AgeKeyring;
use crate::core::Repository;
use crate::error::Result;

pub fn add(repo: &Repository<AgeKeyring>, reference: &str) -> Result<()> {
    let fingerprint = repo.add_identity(reference)?;
    output::success(&format!("registered {}", fingerprint));
    output::hint("commit the repository so your team picks up the new envelope");
    Ok(())
}

pub fn rm(repo: &Repository<AgeKeyring>, reference: &str) -> Result<()> {
    let fingerprint = repo.remove_identity(reference)?;
    output::success(&format!("deregistered {} and rotated the key", fingerprint));
    Ok(())
}

pub fn users(repo: &Repository<AgeKeyring>, json: bool) -> Result<()> {
    let identities: Vec<String> = repo
        .list_identities()?
        .into_iter()
        .map(|f| f.to_string())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&identities).map_err(io_err)?);
    } else if identities.is_empty() {
        println!("no registered identities");
    } else {
        for fingerprint in identities {
            println!("{}", fingerprint);
        }
    }
    Ok(())
}

fn io_err(e: serde_json::Error) -> crate::error::Error {
    crate::error::Error::Io(e.into())
}
