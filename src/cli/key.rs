//! `coffer key` - local keyring management.

use std::path::Path;

use super::{output, KeyAction};
use crate::core::pki::{AgeKeyring, PkiProvider};
use crate::error::Result;

pub fn execute(keyring: &AgeKeyring, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Keygen { name } => keygen(keyring, &name),
        KeyAction::Import { input } => import(keyring, &input),
        KeyAction::Export { reference } => export(keyring, &reference),
        KeyAction::List => list(keyring),
    }
}

fn keygen(keyring: &AgeKeyring, name: &str) -> Result<()> {
    let fingerprint = keyring.generate(name)?;
    output::success(&format!("generated identity {}", name));
    output::kv("fingerprint", fingerprint);
    Ok(())
}

fn import(keyring: &AgeKeyring, input: &str) -> Result<()> {
    // Accept a path to a .pub file or the key itself.
    let bytes = if Path::new(input).is_file() {
        std::fs::read(input)?
    } else {
        input.as_bytes().to_vec()
    };

    let fingerprint = keyring.import_public(&bytes)?;
    output::success(&format!("imported public key {}", fingerprint));
    Ok(())
}

fn export(keyring: &AgeKeyring, reference: &str) -> Result<()> {
    let fingerprint = keyring.resolve(reference)?;
    let public = keyring.export_public(&fingerprint)?;
    print!("{}", String::from_utf8_lossy(&public));
    Ok(())
}

fn list(keyring: &AgeKeyring) -> Result<()> {
    let identities = keyring.local_identities()?;
    if identities.is_empty() {
        println!("no local identities (run: coffer key keygen <name>)");
        return Ok(());
    }
    for (name, fingerprint) in identities {
        println!("{}  {}", fingerprint, name);
    }
    Ok(())
}
