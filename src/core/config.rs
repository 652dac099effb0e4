//! User-level configuration.
//!
//! Read from `<config dir>/coffer/config.toml` (XDG config dir on Linux).
//! Holds local preferences only — nothing repository-scoped lives here, the
//! repository layout itself is the shared state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// User configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Keyring directory override. Defaults to `~/.coffer/keyring`.
    #[serde(default)]
    pub keyring: Option<PathBuf>,

    /// Identity reference used when a command needs one and none is given.
    #[serde(default)]
    pub default_identity: Option<String>,
}

impl Config {
    /// Default configuration file path, if a config directory exists.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("coffer").join("config.toml"))
    }

    /// Load the user configuration, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Persist the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()
            .ok_or_else(|| Error::Config("unable to determine config directory".to_string()))?;
        self.save_to(&path)
    }

    pub(crate) fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Effective keyring directory: explicit override, config value, or
    /// `~/.coffer/keyring`.
    pub fn keyring_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.keyring {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".coffer").join("keyring"))
            .ok_or_else(|| Error::Config("unable to determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("conf").join("config.toml");

        let config = Config {
            keyring: Some(PathBuf::from("/tmp/ring")),
            default_identity: Some("alice".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.keyring, Some(PathBuf::from("/tmp/ring")));
        assert_eq!(loaded.default_identity, Some("alice".to_string()));
    }

    #[test]
    fn test_keyring_dir_precedence() {
        let config = Config {
            keyring: Some(PathBuf::from("/from/config")),
            default_identity: None,
        };

        let flag = PathBuf::from("/from/flag");
        assert_eq!(config.keyring_dir(Some(&flag)).unwrap(), flag);
        assert_eq!(
            config.keyring_dir(None).unwrap(),
            PathBuf::from("/from/config")
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "keyring = [not toml").unwrap();

        assert!(matches!(
            Config::load_from(&path).unwrap_err(),
            Error::TomlParse(_)
        ));
    }
}
