//! Secret operations on the repository facade.

use super::Repository;
use crate::core::cipher::SymmetricCipher;
use crate::core::pki::PkiProvider;
use crate::core::store::SecretWalk;
use crate::error::Result;

impl<P: PkiProvider, C: SymmetricCipher> Repository<P, C> {
    /// Decrypt a secret by name.
    pub fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.store().read(name)
    }

    /// Encrypt and store a secret (overwrite semantics, no merge).
    pub fn put(&self, name: &str, payload: &[u8]) -> Result<()> {
        self.store().write(name, payload)
    }

    /// Remove a secret.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.store().delete(name)
    }

    /// Lazily enumerate secret names.
    pub fn list_secrets(&self) -> SecretWalk {
        self.store().list()
    }
}
