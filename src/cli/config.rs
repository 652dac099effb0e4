//! `coffer config` - user configuration.

use std::path::PathBuf;

use super::{output, ConfigAction};
use crate::core::config::Config;
use crate::error::{Error, Result};

pub fn execute(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(),
        ConfigAction::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    if let Some(path) = Config::path() {
        output::kv("file", path.display());
    }
    output::kv(
        "keyring",
        config
            .keyring
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "(default)".to_string()),
    );
    output::kv(
        "default-identity",
        config.default_identity.unwrap_or_else(|| "(unset)".to_string()),
    );
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    match key {
        "keyring" => config.keyring = Some(PathBuf::from(value)),
        "default-identity" => config.default_identity = Some(value.to_string()),
        _ => {
            return Err(Error::Config(format!(
                "unknown config key {:?}: expected keyring or default-identity",
                key
            )))
        }
    }
    config.save()?;
    output::success(&format!("set {} = {}", key, value));
    Ok(())
}
