//! Active-key lifecycle: generation, wrapping, unwrapping, rotation.
//!
//! The repository has exactly one active symmetric key at any instant. It is
//! never stored in the clear; each registered identity holds an envelope of
//! it (`.keys/<fingerprint>.key`) wrapped under that identity's public key.
//! All envelopes present at a given moment decrypt to the same key.
//!
//! Rotation replaces the key and re-encrypts everything under it. The
//! two-key window that exists while that runs is explicit in [`KeyState`]:
//! a repository is `Stable` around one key or `Rotating` between two, never
//! in an unnamed in-between. If the process dies mid-rotation the directory
//! is inconsistent on disk; the expectation (inherited from the original
//! design) is that the directory lives under version control and is
//! reverted, not repaired in place.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::cipher::{SymmetricCipher, SymmetricKey};
use crate::core::constants;
use crate::core::paths;
use crate::core::pki::{Fingerprint, PkiProvider};
use crate::core::store::SecretStore;
use crate::error::{Error, Result};

/// The active symmetric key as a typed state.
///
/// `Stable` is the normal case. `Rotating` exists only inside [`rotate`]
/// while secrets are migrated; `settle` collapses it back, dropping (and
/// zeroizing) the old key.
///
/// [`rotate`]: EnvelopeKeyManager::rotate
#[derive(Debug)]
pub enum KeyState {
    Stable(SymmetricKey),
    Rotating {
        old: SymmetricKey,
        new: SymmetricKey,
    },
}

impl KeyState {
    /// The key new writes must use.
    pub fn current(&self) -> &SymmetricKey {
        match self {
            KeyState::Stable(key) => key,
            KeyState::Rotating { new, .. } => new,
        }
    }

    /// The superseded key, present only mid-rotation.
    pub fn previous(&self) -> Option<&SymmetricKey> {
        match self {
            KeyState::Stable(_) => None,
            KeyState::Rotating { old, .. } => Some(old),
        }
    }

    /// Finish a rotation: discard the old key, keep the new one.
    pub fn settle(self) -> SymmetricKey {
        match self {
            KeyState::Stable(key) => key,
            KeyState::Rotating { old, new } => {
                drop(old); // zeroized on drop
                new
            }
        }
    }
}

/// Owns the lifecycle of the repository's single active symmetric key.
pub struct EnvelopeKeyManager<'a, P: PkiProvider, C: SymmetricCipher> {
    root: &'a Path,
    provider: &'a P,
    cipher: &'a C,
}

impl<'a, P: PkiProvider, C: SymmetricCipher> EnvelopeKeyManager<'a, P, C> {
    pub fn new(root: &'a Path, provider: &'a P, cipher: &'a C) -> Self {
        Self {
            root,
            provider,
            cipher,
        }
    }

    /// Generate a fresh random key sized for the cipher.
    pub fn generate(&self) -> Result<SymmetricKey> {
        SymmetricKey::generate(self.cipher.key_len())
    }

    /// Fingerprints that currently hold an envelope of the active key.
    pub fn envelopes(&self) -> Result<BTreeSet<Fingerprint>> {
        let dir = paths::key_dir(self.root);
        let mut found = BTreeSet::new();
        if !dir.is_dir() {
            return Ok(found);
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(constants::WRAPPED_KEY_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                found.insert(Fingerprint::from_raw(stem));
            }
        }
        Ok(found)
    }

    /// Wrap `key` under the identity's public key, overwriting any prior
    /// envelope for that identity.
    pub fn wrap_for(&self, fingerprint: &Fingerprint, key: &SymmetricKey) -> Result<()> {
        let wrapped = self.provider.encrypt(fingerprint, key.as_bytes())?;
        fs::create_dir_all(paths::key_dir(self.root))?;
        fs::write(paths::wrapped_key(self.root, fingerprint), wrapped)?;
        debug!(%fingerprint, "wrapped active key");
        Ok(())
    }

    /// Unwrap the active key as some locally-controllable registered
    /// identity.
    ///
    /// The intersection of "private keys available" and "envelopes present"
    /// decides who can unwrap. The choice among several usable identities is
    /// deterministic (lexicographically smallest fingerprint); by the
    /// envelope invariant every choice yields the same key.
    pub fn unwrap_active(&self) -> Result<SymmetricKey> {
        let envelopes = self.envelopes()?;
        if envelopes.is_empty() {
            return Err(Error::NoActiveKey);
        }

        let ours = self.provider.list_private_fingerprints()?;
        let usable = envelopes
            .intersection(&ours)
            .next()
            .cloned()
            .ok_or(Error::NoUsableKey)?;

        self.unwrap_as(&usable)
    }

    /// Unwrap the active key as a specific identity, skipping the search.
    pub fn unwrap_as(&self, fingerprint: &Fingerprint) -> Result<SymmetricKey> {
        let path = paths::wrapped_key(self.root, fingerprint);
        if !path.is_file() {
            return Err(Error::UnknownIdentity(fingerprint.to_string()));
        }

        let wrapped = fs::read(&path)?;
        let raw = self.provider.decrypt(&wrapped)?;
        if raw.len() != self.cipher.key_len() {
            return Err(Error::CryptoProvider(format!(
                "unwrapped key has {} bytes, cipher needs {}",
                raw.len(),
                self.cipher.key_len()
            )));
        }

        debug!(%fingerprint, "unwrapped active key");
        Ok(SymmetricKey::from_bytes(raw))
    }

    /// Replace the active key and re-encrypt every secret under it.
    ///
    /// Sequence: unwrap the current key, generate a new one, wrap the new
    /// key for every identity with an envelope, then migrate each secret
    /// from the old key to the new. Secrets that fail to migrate are
    /// reported in `RotationIncomplete`; everything else will already be
    /// under the new key.
    pub fn rotate(&self) -> Result<()> {
        let old = self.unwrap_active()?;
        let new = self.generate()?;
        let state = KeyState::Rotating { old, new };

        let registered = self.envelopes()?;
        info!(identities = registered.len(), "rotating symmetric key");

        // The local provider may never have seen keys registered by other
        // users; pick their exported publics up from the repository first.
        self.import_registered_publics(&registered)?;

        for fingerprint in &registered {
            self.wrap_for(fingerprint, state.current())?;
        }

        let store = SecretStore::new(self.root, self.provider, self.cipher);
        let names = store.list().collect::<Result<Vec<_>>>()?;

        let old_key = state.previous().unwrap_or_else(|| state.current());
        let mut failed_names = Vec::new();
        for name in names {
            let migrated = store
                .read_with(&name, old_key)
                .and_then(|plaintext| store.write_with(&name, &plaintext, state.current()));
            if let Err(e) = migrated {
                warn!(name = %name, error = %e, "failed to re-encrypt secret");
                failed_names.push(name);
            }
        }

        let _ = state.settle();

        if failed_names.is_empty() {
            info!("rotation complete");
            Ok(())
        } else {
            Err(Error::RotationIncomplete { failed_names })
        }
    }

    /// Import every registered identity's exported public key into the
    /// provider, so wrapping works for identities registered elsewhere.
    fn import_registered_publics(&self, registered: &BTreeSet<Fingerprint>) -> Result<()> {
        for fingerprint in registered {
            let path = paths::public_key(self.root, fingerprint);
            if path.is_file() {
                self.provider.import_public(&fs::read(&path)?)?;
            }
        }
        Ok(())
    }
}
