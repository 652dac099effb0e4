//! `coffer get` / `put` / `del` / `list` / `rotate` - secret operations.

use std::io::{Read, Write};

use super::output;
use crate::core::pki::AgeKeyring;
use crate::core::Repository;
use crate::error::Result;

pub fn get(repo: &Repository<AgeKeyring>, name: &str) -> Result<()> {
    let payload = repo.get(name)?;
    std::io::stdout().write_all(&payload)?;
    Ok(())
}

pub fn put(repo: &Repository<AgeKeyring>, name: &str, value: Option<&str>) -> Result<()> {
    let payload = match value {
        Some(v) => v.as_bytes().to_vec(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    repo.put(name, &payload)?;
    output::success(&format!("stored {}", name));
    Ok(())
}

pub fn del(repo: &Repository<AgeKeyring>, name: &str) -> Result<()> {
    repo.delete(name)?;
    output::success(&format!("deleted {}", name));
    Ok(())
}

pub fn list(repo: &Repository<AgeKeyring>, json: bool) -> Result<()> {
    let names = repo.list_secrets().collect::<Result<Vec<_>>>()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&names)
                .map_err(|e| crate::error::Error::Io(e.into()))?
        );
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

pub fn rotate(repo: &Repository<AgeKeyring>) -> Result<()> {
    repo.rotate_key()?;
    output::success("rotated the symmetric key and re-encrypted all secrets");
    output::hint("commit the repository so your team picks up the new envelopes");
    Ok(())
}
