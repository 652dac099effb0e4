//! `coffer init` - bootstrap a repository.

use std::path::PathBuf;

use super::{open_keyring, output};
use crate::core::config::Config;
use crate::core::Repository;
use crate::error::Result;

pub fn execute(repo: &PathBuf, keyring: Option<&PathBuf>, identities: &[String]) -> Result<()> {
    let provider = open_keyring(keyring)?;

    // No -i flag: fall back to the configured default identity. Bootstrap
    // itself rejects an empty set.
    let mut identities = identities.to_vec();
    if identities.is_empty() {
        if let Some(default) = Config::load()?.default_identity {
            identities.push(default);
        }
    }

    let repository = Repository::bootstrap(repo.clone(), provider, &identities)?;

    output::success(&format!(
        "initialized repository at {}",
        repository.root().display()
    ));
    for fingerprint in repository.list_identities()? {
        output::kv("identity", fingerprint);
    }
    Ok(())
}
