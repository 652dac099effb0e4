//! The primary interface for coffer operations.
//!
//! A [`Repository`] ties a root directory to a PKI provider and a symmetric
//! cipher, and exposes the upward contract: bootstrap, identity management,
//! key rotation, and secret CRUD.

mod identities;
mod secrets;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::cipher::{Aes256Gcm, SymmetricCipher, SymmetricKey};
use crate::core::envelope::EnvelopeKeyManager;
use crate::core::paths;
use crate::core::pki::PkiProvider;
use crate::core::registry::IdentityRegistry;
use crate::core::store::SecretStore;
use crate::error::{Error, Result};

/// A shared-secrets directory plus the collaborators needed to use it.
pub struct Repository<P: PkiProvider, C: SymmetricCipher = Aes256Gcm> {
    root: PathBuf,
    provider: P,
    cipher: C,
}

impl<P: PkiProvider> Repository<P> {
    /// Open an existing repository with the default cipher.
    pub fn open(root: impl Into<PathBuf>, provider: P) -> Result<Self> {
        Self::open_with(root, provider, Aes256Gcm)
    }

    /// One-shot initialization of an empty directory with the default
    /// cipher. See [`bootstrap_with`](Repository::bootstrap_with).
    pub fn bootstrap<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        provider: P,
        identities: &[S],
    ) -> Result<Self> {
        Self::bootstrap_with(root, provider, Aes256Gcm, identities)
    }
}

impl<P: PkiProvider, C: SymmetricCipher> Repository<P, C> {
    /// Open an existing repository.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if the root has no `.keys` directory.
    pub fn open_with(root: impl Into<PathBuf>, provider: P, cipher: C) -> Result<Self> {
        let root = root.into();
        if !paths::key_dir(&root).is_dir() {
            return Err(Error::NotInitialized(root.display().to_string()));
        }
        Ok(Self {
            root,
            provider,
            cipher,
        })
    }

    /// Turn an empty (or absent) directory into a valid repository for the
    /// given initial identity references.
    ///
    /// Generates the first symmetric key and wraps it once per identity;
    /// after this every listed identity can decrypt everything written to
    /// the repository.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryNotEmpty` if `root` exists and contains any entry,
    /// `NoIdentities` when the identity list is empty, and `UnknownIdentity`
    /// when a reference does not resolve.
    pub fn bootstrap_with<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        provider: P,
        cipher: C,
        identities: &[S],
    ) -> Result<Self> {
        let root = root.into();

        if identities.is_empty() {
            return Err(Error::NoIdentities);
        }
        if root.exists() && fs::read_dir(&root)?.next().is_some() {
            return Err(Error::DirectoryNotEmpty(root.display().to_string()));
        }

        // Resolve every reference before creating anything.
        let mut fingerprints = BTreeSet::new();
        for reference in identities {
            fingerprints.insert(provider.resolve(reference.as_ref())?);
        }

        fs::create_dir_all(paths::key_dir(&root))?;

        let repo = Self {
            root,
            provider,
            cipher,
        };

        let key = SymmetricKey::generate(repo.cipher.key_len())?;
        let envelope = repo.envelope();
        for fingerprint in &fingerprints {
            let public = repo.provider.export_public(fingerprint)?;
            fs::write(paths::public_key(&repo.root, fingerprint), public)?;
            envelope.wrap_for(fingerprint, &key)?;
        }

        info!(
            root = %repo.root.display(),
            identities = fingerprints.len(),
            "bootstrapped repository"
        );
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Envelope key manager component.
    pub fn envelope(&self) -> EnvelopeKeyManager<'_, P, C> {
        EnvelopeKeyManager::new(&self.root, &self.provider, &self.cipher)
    }

    /// Identity registry component.
    pub fn registry(&self) -> IdentityRegistry<'_, P, C> {
        IdentityRegistry::new(&self.root, &self.provider, &self.cipher)
    }

    /// Secret store component.
    pub fn store(&self) -> SecretStore<'_, P, C> {
        SecretStore::new(&self.root, &self.provider, &self.cipher)
    }

    /// Replace the active symmetric key and re-encrypt every secret.
    pub fn rotate_key(&self) -> Result<()> {
        self.envelope().rotate()
    }
}

impl<P: PkiProvider, C: SymmetricCipher> std::fmt::Debug for Repository<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("provider", &self.provider.name())
            .field("cipher", &self.cipher.name())
            .finish()
    }
}
