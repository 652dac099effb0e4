//! Identity operations on the repository facade.

use super::Repository;
use crate::core::cipher::SymmetricCipher;
use crate::core::pki::{Fingerprint, PkiProvider};
use crate::error::Result;

impl<P: PkiProvider, C: SymmetricCipher> Repository<P, C> {
    /// Register an identity by reference so it can decrypt every secret.
    ///
    /// Resolves the reference through the provider, exports the public key
    /// into `.keys/`, and wraps the active key for the newcomer. Nothing is
    /// re-encrypted; adding a reader never requires touching the secrets.
    pub fn add_identity(&self, reference: &str) -> Result<Fingerprint> {
        let fingerprint = self.registry().resolve(reference)?;
        self.registry().register(&fingerprint)?;
        Ok(fingerprint)
    }

    /// Deregister an identity and rotate the key so it is locked out of all
    /// current secrets.
    pub fn remove_identity(&self, reference: &str) -> Result<Fingerprint> {
        let fingerprint = self.registry().resolve_registered(reference)?;
        self.registry().deregister(&fingerprint)?;
        Ok(fingerprint)
    }

    /// Registered fingerprints, in lexicographic order.
    pub fn list_identities(&self) -> Result<Vec<Fingerprint>> {
        Ok(self.registry().list()?.into_iter().collect())
    }
}
