//! Encrypted secret storage under the repository root.
//!
//! A secret is a relative path mapped to a file holding `IV || ciphertext`.
//! Names are rejected rather than normalized when they could escape the
//! root: absolute paths, parent-directory segments, and hidden components
//! are all invalid. Hidden entries and `~`-suffixed backup files never show
//! up in listings; the store itself writes through a `~`-suffixed sibling
//! before renaming into place.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::core::cipher::{SymmetricCipher, SymmetricKey};
use crate::core::constants;
use crate::core::envelope::EnvelopeKeyManager;
use crate::core::pki::PkiProvider;
use crate::error::{Error, Result};

/// Secret read/write/delete/list on top of the active symmetric key.
pub struct SecretStore<'a, P: PkiProvider, C: SymmetricCipher> {
    root: &'a Path,
    provider: &'a P,
    cipher: &'a C,
}

impl<'a, P: PkiProvider, C: SymmetricCipher> SecretStore<'a, P, C> {
    pub fn new(root: &'a Path, provider: &'a P, cipher: &'a C) -> Self {
        Self {
            root,
            provider,
            cipher,
        }
    }

    fn envelope(&self) -> EnvelopeKeyManager<'a, P, C> {
        EnvelopeKeyManager::new(self.root, self.provider, self.cipher)
    }

    /// Resolve a secret name to its path, rejecting anything that could
    /// escape the root or collide with reserved patterns.
    fn resolve_name(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Decrypt a secret using the active key.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = self.envelope().unwrap_active()?;
        self.read_with(name, &key)
    }

    /// Decrypt a secret with a caller-supplied key (batch use, rotation).
    pub fn read_with(&self, name: &str, key: &SymmetricKey) -> Result<Vec<u8>> {
        let path = self.resolve_name(name)?;
        if !path.is_file() {
            return Err(Error::SecretNotFound(name.to_string()));
        }

        let data = fs::read(&path)?;
        let iv_len = self.cipher.iv_len();
        if data.len() < iv_len {
            return Err(Error::DecryptionFailed(format!(
                "{}: file shorter than the {}-byte IV prefix",
                name, iv_len
            )));
        }

        let (iv, ciphertext) = data.split_at(iv_len);
        trace!(name, bytes = data.len(), "reading secret");
        self.cipher.decrypt(key, iv, ciphertext)
    }

    /// Encrypt and store a secret under the active key (overwrite semantics).
    pub fn write(&self, name: &str, plaintext: &[u8]) -> Result<()> {
        let key = self.envelope().unwrap_active()?;
        self.write_with(name, plaintext, &key)
    }

    /// Encrypt and store with a caller-supplied key (batch use, rotation).
    pub fn write_with(&self, name: &str, plaintext: &[u8], key: &SymmetricKey) -> Result<()> {
        let path = self.resolve_name(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let iv = self.cipher.random_iv()?;
        let ciphertext = self.cipher.encrypt(key, &iv, plaintext)?;

        let mut data = Vec::with_capacity(iv.len() + ciphertext.len());
        data.extend_from_slice(&iv);
        data.extend_from_slice(&ciphertext);

        // Write through a `~` sibling so a crash never leaves a
        // half-written secret under its real name.
        let tmp = backup_sibling(&path);
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &path)?;

        debug!(name, bytes = data.len(), "wrote secret");
        Ok(())
    }

    /// Remove a secret file.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name)?;
        if !path.is_file() {
            return Err(Error::SecretNotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        debug!(name, "deleted secret");
        Ok(())
    }

    /// Lazily enumerate secret names, relative to the root.
    ///
    /// Hidden files and directories (leading `.`) are pruned, `~`-suffixed
    /// backup files skipped. The walk reflects the tree as visited; re-list
    /// to re-walk.
    pub fn list(&self) -> SecretWalk {
        let inner = WalkDir::new(self.root)
            .into_iter()
            .filter_entry(not_hidden as fn(&DirEntry) -> bool);
        SecretWalk {
            root: self.root.to_path_buf(),
            inner,
        }
    }
}

fn not_hidden(entry: &DirEntry) -> bool {
    // Depth 0 is the root itself; its name is not a secret name.
    entry.depth() == 0
        || !entry
            .file_name()
            .to_string_lossy()
            .starts_with(constants::HIDDEN_PREFIX)
}

fn backup_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(constants::BACKUP_SUFFIX.to_string());
    PathBuf::from(tmp)
}

/// Reject names that escape the root or collide with reserved patterns.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidPath("empty name".to_string()));
    }
    if name.ends_with(constants::BACKUP_SUFFIX) {
        return Err(Error::InvalidPath(format!("{}: reserved backup suffix", name)));
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err(Error::InvalidPath(format!("{}: absolute path", name)));
    }

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if part.to_string_lossy().starts_with(constants::HIDDEN_PREFIX) {
                    return Err(Error::InvalidPath(format!("{}: hidden component", name)));
                }
            }
            _ => {
                return Err(Error::InvalidPath(format!(
                    "{}: path may not contain '..', '.' or a root segment",
                    name
                )));
            }
        }
    }

    Ok(())
}

/// Lazy walk over secret names.
pub struct SecretWalk {
    root: PathBuf,
    inner: walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
}

impl Iterator for SecretWalk {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(Error::Io(e.into()))),
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if file_name.ends_with(constants::BACKUP_SUFFIX) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or_else(|_| entry.path());
            return Some(Ok(relative.to_string_lossy().into_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_nested_paths() {
        assert!(validate_name("db/prod/password").is_ok());
        assert!(validate_name("account-1").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_traversal() {
        assert!(matches!(
            validate_name("../outside").unwrap_err(),
            Error::InvalidPath(_)
        ));
        assert!(matches!(
            validate_name("db/../../outside").unwrap_err(),
            Error::InvalidPath(_)
        ));
        assert!(matches!(
            validate_name("/etc/passwd").unwrap_err(),
            Error::InvalidPath(_)
        ));
    }

    #[test]
    fn test_validate_name_rejects_reserved_patterns() {
        assert!(matches!(validate_name("").unwrap_err(), Error::InvalidPath(_)));
        assert!(matches!(
            validate_name(".hidden").unwrap_err(),
            Error::InvalidPath(_)
        ));
        assert!(matches!(
            validate_name(".keys/stolen").unwrap_err(),
            Error::InvalidPath(_)
        ));
        assert!(matches!(
            validate_name("backup~").unwrap_err(),
            Error::InvalidPath(_)
        ));
    }

    #[test]
    fn test_backup_sibling_appends_suffix() {
        let tmp = backup_sibling(Path::new("dir/secret"));
        assert_eq!(tmp, PathBuf::from("dir/secret~"));
    }
}
