//! Filesystem keyring backed by age x25519 keys.
//!
//! Layout under the keyring directory (default `~/.coffer/keyring`):
//!
//! ```text
//! <keyring>/
//!   <name>.identity      # private key, AGE-SECRET-KEY-... (0600 on Unix)
//!   imported/
//!     <fingerprint>.pub  # imported teammate public keys
//! ```
//!
//! Wrapped blobs are ASCII-armored age files so they stay readable (and
//! diffable) when the repository lives in version control.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use ::age::secrecy::ExposeSecret;
use ::age::x25519;
use tracing::debug;

use super::{match_fingerprint, parse_public, unwrap_with_identities, wrap_to_recipient};
use super::{Fingerprint, PkiProvider};
use crate::core::constants;
use crate::error::{Error, Result};

/// Filesystem keyring of age identities and imported recipients.
pub struct AgeKeyring {
    dir: PathBuf,
}

impl AgeKeyring {
    /// Open a keyring rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Generate a new named identity and store it in the keyring.
    pub fn generate(&self, name: &str) -> Result<Fingerprint> {
        validate_key_name(name)?;

        let path = self.identity_path(name);
        if path.exists() {
            return Err(Error::AlreadyRegistered(name.to_string()));
        }

        let identity = x25519::Identity::generate();
        let fingerprint = Fingerprint::of_recipient(&identity.to_public());

        fs::create_dir_all(&self.dir)?;
        let secret = identity.to_string();
        fs::write(&path, format!("{}\n", secret.expose_secret()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(name, %fingerprint, "generated identity");
        Ok(fingerprint)
    }

    /// Named private identities in the keyring.
    pub fn local_identities(&self) -> Result<Vec<(String, Fingerprint)>> {
        Ok(self
            .identities()?
            .into_iter()
            .map(|(name, identity)| (name, Fingerprint::of_recipient(&identity.to_public())))
            .collect())
    }

    fn identity_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, constants::IDENTITY_EXT))
    }

    fn imported_dir(&self) -> PathBuf {
        self.dir.join(constants::IMPORTED_DIR)
    }

    /// Scan `*.identity` files into (name, identity) pairs.
    fn identities(&self) -> Result<Vec<(String, x25519::Identity)>> {
        let mut found = Vec::new();
        if !self.dir.is_dir() {
            return Ok(found);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(constants::IDENTITY_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let contents = fs::read_to_string(&path)?;
            let identity = contents
                .trim()
                .parse::<x25519::Identity>()
                .map_err(|_| {
                    Error::CryptoProvider(format!("malformed identity file: {}", path.display()))
                })?;
            found.push((name.to_string(), identity));
        }
        Ok(found)
    }

    /// Scan imported public keys into a fingerprint → recipient map.
    fn imported(&self) -> Result<BTreeMap<Fingerprint, x25519::Recipient>> {
        let mut found = BTreeMap::new();
        let dir = self.imported_dir();
        if !dir.is_dir() {
            return Ok(found);
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(constants::PUBLIC_KEY_EXT) {
                continue;
            }
            let recipient = parse_public(&fs::read(&path)?)?;
            found.insert(Fingerprint::of_recipient(&recipient), recipient);
        }
        Ok(found)
    }

    /// Every recipient this keyring can encrypt to, own keys included.
    fn known_recipients(&self) -> Result<BTreeMap<Fingerprint, x25519::Recipient>> {
        let mut known = self.imported()?;
        for (_, identity) in self.identities()? {
            let recipient = identity.to_public();
            known.insert(Fingerprint::of_recipient(&recipient), recipient);
        }
        Ok(known)
    }
}

impl PkiProvider for AgeKeyring {
    fn name(&self) -> &'static str {
        "age-keyring"
    }

    fn resolve(&self, reference: &str) -> Result<Fingerprint> {
        // Identity name first: names are free-form and must win over
        // accidental fingerprint-prefix matches.
        for (name, identity) in self.identities()? {
            if name == reference {
                return Ok(Fingerprint::of_recipient(&identity.to_public()));
            }
        }

        let known = self.known_recipients()?;

        if let Ok(recipient) = reference.parse::<x25519::Recipient>() {
            let fingerprint = Fingerprint::of_recipient(&recipient);
            if known.contains_key(&fingerprint) {
                return Ok(fingerprint);
            }
            return Err(Error::UnknownIdentity(reference.to_string()));
        }

        let fingerprints: BTreeSet<_> = known.into_keys().collect();
        match_fingerprint(reference, &fingerprints)?
            .ok_or_else(|| Error::UnknownIdentity(reference.to_string()))
    }

    fn encrypt(&self, fingerprint: &Fingerprint, plaintext: &[u8]) -> Result<Vec<u8>> {
        let known = self.known_recipients()?;
        let recipient = known
            .get(fingerprint)
            .ok_or_else(|| Error::UnknownIdentity(fingerprint.to_string()))?;
        wrap_to_recipient(recipient, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let identities = self.identities()?;
        if identities.is_empty() {
            return Err(Error::CryptoProvider("keyring has no private keys".to_string()));
        }
        unwrap_with_identities(identities.iter().map(|(_, i)| i), ciphertext)
    }

    fn export_public(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
        let known = self.known_recipients()?;
        let recipient = known
            .get(fingerprint)
            .ok_or_else(|| Error::UnknownIdentity(fingerprint.to_string()))?;
        Ok(format!("{}\n", recipient).into_bytes())
    }

    fn import_public(&self, key: &[u8]) -> Result<Fingerprint> {
        let recipient = parse_public(key)?;
        let fingerprint = Fingerprint::of_recipient(&recipient);

        let dir = self.imported_dir();
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join(format!("{}.{}", fingerprint, constants::PUBLIC_KEY_EXT)),
            format!("{}\n", recipient),
        )?;

        debug!(%fingerprint, "imported public key");
        Ok(fingerprint)
    }

    fn list_private_fingerprints(&self) -> Result<BTreeSet<Fingerprint>> {
        Ok(self
            .identities()?
            .into_iter()
            .map(|(_, identity)| Fingerprint::of_recipient(&identity.to_public()))
            .collect())
    }

    fn list_public_fingerprints(&self) -> Result<BTreeSet<Fingerprint>> {
        Ok(self.known_recipients()?.into_keys().collect())
    }
}

/// Keyring names become file stems; keep them boring.
fn validate_key_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Config(format!(
            "invalid identity name {:?}: use letters, digits, '-' or '_'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keyring() -> (TempDir, AgeKeyring) {
        let tmp = TempDir::new().unwrap();
        let ring = AgeKeyring::open(tmp.path().join("keyring"));
        (tmp, ring)
    }

    #[test]
    fn test_generate_and_resolve_by_name() {
        let (_tmp, ring) = keyring();
        let fingerprint = ring.generate("alice").unwrap();

        assert_eq!(ring.resolve("alice").unwrap(), fingerprint);
        assert_eq!(ring.resolve(fingerprint.as_str()).unwrap(), fingerprint);
    }

    #[test]
    fn test_generate_rejects_duplicate_name() {
        let (_tmp, ring) = keyring();
        ring.generate("alice").unwrap();
        assert!(matches!(
            ring.generate("alice").unwrap_err(),
            Error::AlreadyRegistered(_)
        ));
    }

    #[test]
    fn test_encrypt_decrypt_through_keyring() {
        let (_tmp, ring) = keyring();
        let fingerprint = ring.generate("alice").unwrap();

        let wrapped = ring.encrypt(&fingerprint, b"shared key").unwrap();
        assert_eq!(ring.decrypt(&wrapped).unwrap(), b"shared key");
    }

    #[test]
    fn test_import_export_between_keyrings() {
        let (_tmp_a, alice) = keyring();
        let (_tmp_b, bob) = keyring();

        let bob_fpr = bob.generate("bob").unwrap();
        let exported = bob.export_public(&bob_fpr).unwrap();

        let imported_fpr = alice.import_public(&exported).unwrap();
        assert_eq!(imported_fpr, bob_fpr);

        // Alice can now encrypt to bob, and only bob can read it.
        let wrapped = alice.encrypt(&bob_fpr, b"for bob").unwrap();
        assert_eq!(bob.decrypt(&wrapped).unwrap(), b"for bob");
        assert!(alice.decrypt(&wrapped).is_err());
    }

    #[test]
    fn test_private_and_public_listings() {
        let (_tmp_a, alice) = keyring();
        let (_tmp_b, bob) = keyring();

        let alice_fpr = alice.generate("alice").unwrap();
        let bob_fpr = bob.generate("bob").unwrap();
        alice
            .import_public(&bob.export_public(&bob_fpr).unwrap())
            .unwrap();

        let private = alice.list_private_fingerprints().unwrap();
        assert!(private.contains(&alice_fpr));
        assert!(!private.contains(&bob_fpr));

        let public = alice.list_public_fingerprints().unwrap();
        assert!(public.contains(&alice_fpr));
        assert!(public.contains(&bob_fpr));
    }

    #[test]
    fn test_resolve_unknown_reference() {
        let (_tmp, ring) = keyring();
        ring.generate("alice").unwrap();
        assert!(matches!(
            ring.resolve("mallory").unwrap_err(),
            Error::UnknownIdentity(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, ring) = keyring();
        ring.generate("alice").unwrap();

        let path = ring.identity_path("alice");
        let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
