//! In-memory PKI provider.
//!
//! Test double for [`PkiProvider`]: same resolution and wrap/unwrap semantics
//! as the filesystem keyring, no disk and no real keyring required. Also
//! handy for embedding coffer in programs that manage key material
//! themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use ::age::x25519;

use super::{match_fingerprint, parse_public, unwrap_with_identities, wrap_to_recipient};
use super::{Fingerprint, PkiProvider};
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    /// name → private identity
    identities: BTreeMap<String, x25519::Identity>,
    /// imported public keys
    imported: BTreeMap<Fingerprint, x25519::Recipient>,
}

impl Inner {
    fn known_recipients(&self) -> BTreeMap<Fingerprint, x25519::Recipient> {
        let mut known = self.imported.clone();
        for identity in self.identities.values() {
            let recipient = identity.to_public();
            known.insert(Fingerprint::of_recipient(&recipient), recipient);
        }
        known
    }
}

/// In-memory key store implementing [`PkiProvider`].
#[derive(Default)]
pub struct MemoryPki {
    inner: Mutex<Inner>,
}

impl MemoryPki {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate a named private identity.
    pub fn generate(&self, name: &str) -> Fingerprint {
        let identity = x25519::Identity::generate();
        let fingerprint = Fingerprint::of_recipient(&identity.to_public());
        self.lock().identities.insert(name.to_string(), identity);
        fingerprint
    }

    /// Drop a private key, keeping nothing. Simulates a revoked user who no
    /// longer holds their identity.
    pub fn forget_private(&self, name: &str) -> bool {
        self.lock().identities.remove(name).is_some()
    }
}

impl PkiProvider for MemoryPki {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn resolve(&self, reference: &str) -> Result<Fingerprint> {
        let inner = self.lock();

        if let Some(identity) = inner.identities.get(reference) {
            return Ok(Fingerprint::of_recipient(&identity.to_public()));
        }

        let known = inner.known_recipients();

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
        let known = self.lock().known_recipients();
        let recipient = known
            .get(fingerprint)
            .ok_or_else(|| Error::UnknownIdentity(fingerprint.to_string()))?;
        wrap_to_recipient(recipient, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let inner = self.lock();
        if inner.identities.is_empty() {
            return Err(Error::CryptoProvider("no private keys available".to_string()));
        }
        unwrap_with_identities(inner.identities.values(), ciphertext)
    }

    fn export_public(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
        let known = self.lock().known_recipients();
        let recipient = known
            .get(fingerprint)
            .ok_or_else(|| Error::UnknownIdentity(fingerprint.to_string()))?;
        Ok(format!("{}\n", recipient).into_bytes())
    }

    fn import_public(&self, key: &[u8]) -> Result<Fingerprint> {
        let recipient = parse_public(key)?;
        let fingerprint = Fingerprint::of_recipient(&recipient);
        self.lock().imported.insert(fingerprint.clone(), recipient);
        Ok(fingerprint)
    }

    fn list_private_fingerprints(&self) -> Result<BTreeSet<Fingerprint>> {
        Ok(self
            .lock()
            .identities
            .values()
            .map(|i| Fingerprint::of_recipient(&i.to_public()))
            .collect())
    }

    fn list_public_fingerprints(&self) -> Result<BTreeSet<Fingerprint>> {
        Ok(self.lock().known_recipients().into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_resolve_roundtrip() {
        let pki = MemoryPki::new();
        let fingerprint = pki.generate("alice");

        assert_eq!(pki.resolve("alice").unwrap(), fingerprint);
        assert_eq!(pki.resolve(fingerprint.as_str()).unwrap(), fingerprint);
        assert_eq!(pki.resolve(&fingerprint.as_str()[..12]).unwrap(), fingerprint);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let pki = MemoryPki::new();
        let fingerprint = pki.generate("alice");

        let wrapped = pki.encrypt(&fingerprint, b"payload").unwrap();
        assert_eq!(pki.decrypt(&wrapped).unwrap(), b"payload");
    }

    #[test]
    fn test_import_makes_encrypt_possible() {
        let alice = MemoryPki::new();
        let bob = MemoryPki::new();

        let bob_fpr = bob.generate("bob");
        alice
            .import_public(&bob.export_public(&bob_fpr).unwrap())
            .unwrap();

        let wrapped = alice.encrypt(&bob_fpr, b"for bob").unwrap();
        assert_eq!(bob.decrypt(&wrapped).unwrap(), b"for bob");
        assert!(alice.decrypt(&wrapped).is_err());
    }

    #[test]
    fn test_forget_private_revokes_decryption() {
        let pki = MemoryPki::new();
        let fingerprint = pki.generate("alice");
        let wrapped = pki.encrypt(&fingerprint, b"payload").unwrap();

        assert!(pki.forget_private("alice"));
        assert!(pki.decrypt(&wrapped).is_err());
        assert!(pki.list_private_fingerprints().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_by_full_public_key() {
        let pki = MemoryPki::new();
        let fingerprint = pki.generate("alice");
        let exported = pki.export_public(&fingerprint).unwrap();
        let key_str = String::from_utf8(exported).unwrap();

        assert_eq!(pki.resolve(key_str.trim()).unwrap(), fingerprint);
    }
}
