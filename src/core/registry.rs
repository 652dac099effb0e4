//! Registered-identity bookkeeping.
//!
//! An identity is registered when its exported public key and its envelope
//! of the active key both sit in `.keys/`. Registration wraps the current
//! key for the newcomer; deregistration removes both files and rotates, so
//! the removed identity cannot decrypt anything going forward.
//!
//! Mutations compute everything that can fail before touching disk. True
//! atomicity across several files is out of scope; the repository is
//! expected to live under version control and be reverted on a crash.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::core::cipher::SymmetricCipher;
use crate::core::envelope::EnvelopeKeyManager;
use crate::core::paths;
use crate::core::pki::{Fingerprint, PkiProvider};
use crate::error::{Error, Result};

/// Tracks which identities are authorized for the repository.
pub struct IdentityRegistry<'a, P: PkiProvider, C: SymmetricCipher> {
    root: &'a Path,
    provider: &'a P,
    cipher: &'a C,
}

impl<'a, P: PkiProvider, C: SymmetricCipher> IdentityRegistry<'a, P, C> {
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

    /// Registered fingerprints, from the stored public-key exports.
    pub fn list(&self) -> Result<BTreeSet<Fingerprint>> {
        let dir = paths::key_dir(self.root);
        let mut found = BTreeSet::new();
        if !dir.is_dir() {
            return Ok(found);
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str())
                != Some(crate::core::constants::PUBLIC_KEY_EXT)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                found.insert(Fingerprint::from_raw(stem));
            }
        }
        Ok(found)
    }

    /// Normalize a user-supplied reference to a canonical fingerprint.
    pub fn resolve(&self, reference: &str) -> Result<Fingerprint> {
        self.provider.resolve(reference)
    }

    /// Resolve a reference against the registered set itself.
    ///
    /// Useful for removal, where the local provider may know nothing about
    /// the identity beyond what the repository stores.
    pub fn resolve_registered(&self, reference: &str) -> Result<Fingerprint> {
        let registered = self.list()?;
        if let Some(hit) = crate::core::pki::match_fingerprint(reference, &registered)? {
            return Ok(hit);
        }

        let fingerprint = self.provider.resolve(reference)?;
        if registered.contains(&fingerprint) {
            Ok(fingerprint)
        } else {
            Err(Error::UnknownIdentity(reference.to_string()))
        }
    }

    pub fn is_registered(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.list()?.contains(fingerprint))
    }

    /// Register an identity: export its public key into the repository and
    /// wrap the active key for it.
    pub fn register(&self, fingerprint: &Fingerprint) -> Result<()> {
        if self.is_registered(fingerprint)? {
            return Err(Error::AlreadyRegistered(fingerprint.to_string()));
        }

        // Everything fallible happens before any file is written.
        let envelope = self.envelope();
        let key = envelope.unwrap_active()?;
        let public = self.provider.export_public(fingerprint)?;
        let wrapped = self.provider.encrypt(fingerprint, key.as_bytes())?;

        fs::create_dir_all(paths::key_dir(self.root))?;
        fs::write(paths::public_key(self.root, fingerprint), public)?;
        fs::write(paths::wrapped_key(self.root, fingerprint), wrapped)?;

        info!(%fingerprint, "registered identity");
        Ok(())
    }

    /// Deregister an identity and rotate the key so it is locked out.
    ///
    /// Refuses to remove the last registered identity: that would leave the
    /// repository permanently unreadable. (The design this replaces allowed
    /// it; the refusal is a deliberate strengthening.)
    pub fn deregister(&self, fingerprint: &Fingerprint) -> Result<()> {
        let registered = self.list()?;
        if !registered.contains(fingerprint) {
            return Err(Error::UnknownIdentity(fingerprint.to_string()));
        }
        if registered.len() == 1 {
            return Err(Error::LastIdentity(fingerprint.to_string()));
        }

        let public = paths::public_key(self.root, fingerprint);
        let wrapped = paths::wrapped_key(self.root, fingerprint);
        if public.is_file() {
            fs::remove_file(&public)?;
        }
        if wrapped.is_file() {
            fs::remove_file(&wrapped)?;
        }
        debug!(%fingerprint, "removed identity files");

        // The removed identity could still decrypt the old key from version
        // control history; rotating makes current secrets unreachable to it.
        self.envelope().rotate()?;

        info!(%fingerprint, "deregistered identity");
        Ok(())
    }
}
