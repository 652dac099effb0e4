//! Asymmetric provider capability.
//!
//! The repository never talks to a key backend directly; everything goes
//! through the [`PkiProvider`] trait so the custody logic can be tested
//! against an in-memory key store instead of a real keyring.
//!
//! ## Implementations
//!
//! - [`AgeKeyring`]: production backend, a directory of age x25519
//!   identities plus imported recipients.
//! - [`MemoryPki`]: in-memory test double with the same semantics.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{Read, Write};

use ::age::x25519;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

mod age;
pub mod memory;

pub use self::age::AgeKeyring;
pub use memory::MemoryPki;

/// Number of digest bytes kept in a fingerprint (40 hex characters).
const FINGERPRINT_BYTES: usize = 20;

/// Stable, opaque identifier for a public/private key pair.
///
/// Derived as the truncated SHA-256 of the recipient encoding, rendered as
/// upper-case hex. Immutable once an identity is registered.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of an age recipient.
    pub fn of_recipient(recipient: &x25519::Recipient) -> Self {
        let digest = Sha256::digest(recipient.to_string().as_bytes());
        Self(hex_upper(&digest[..FINGERPRINT_BYTES]))
    }

    /// Wrap an already-canonical fingerprint string (e.g. a `.keys` file stem).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Asymmetric cryptography capability consumed by the repository.
///
/// Mirrors what a GPG-style backend offers: reference resolution, public-key
/// encryption to a named recipient, trial decryption with whatever private
/// keys are locally available, and public-key import/export.
pub trait PkiProvider {
    /// Normalize a user-supplied reference (name, fingerprint, fingerprint
    /// prefix, or full public key) to a canonical fingerprint.
    fn resolve(&self, reference: &str) -> Result<Fingerprint>;

    /// Encrypt a small blob to the identity's public key.
    fn encrypt(&self, fingerprint: &Fingerprint, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a blob with whichever locally-available private key matches.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Export the identity's public key in a portable encoding.
    fn export_public(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>>;

    /// Import a public key previously produced by [`export_public`].
    ///
    /// Idempotent; returns the key's fingerprint.
    ///
    /// [`export_public`]: PkiProvider::export_public
    fn import_public(&self, key: &[u8]) -> Result<Fingerprint>;

    /// Fingerprints of locally-available private keys.
    fn list_private_fingerprints(&self) -> Result<BTreeSet<Fingerprint>>;

    /// Fingerprints of all known public keys (own and imported).
    fn list_public_fingerprints(&self) -> Result<BTreeSet<Fingerprint>>;

    /// Backend name for display/config.
    fn name(&self) -> &'static str;
}

/// Minimum reference length for fingerprint-prefix matching.
const MIN_PREFIX: usize = 8;

/// Match a reference against a set of known fingerprints.
///
/// Accepts an exact fingerprint or a unique hex prefix of at least
/// [`MIN_PREFIX`] characters. Returns `Ok(None)` when nothing matches and
/// `AmbiguousIdentity` when a prefix matches more than one key.
pub(crate) fn match_fingerprint(
    reference: &str,
    known: &BTreeSet<Fingerprint>,
) -> Result<Option<Fingerprint>> {
    let upper = reference.to_ascii_uppercase();
    if !upper.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(None);
    }

    if let Some(exact) = known.iter().find(|f| f.as_str() == upper) {
        return Ok(Some(exact.clone()));
    }

    if upper.len() < MIN_PREFIX {
        return Ok(None);
    }

    let mut hits = known.iter().filter(|f| f.as_str().starts_with(&upper));
    match (hits.next(), hits.next()) {
        (None, _) => Ok(None),
        (Some(one), None) => Ok(Some(one.clone())),
        (Some(_), Some(_)) => Err(Error::AmbiguousIdentity(reference.to_string())),
    }
}

/// Encrypt `plaintext` to a single recipient, ASCII-armored.
///
/// Armored output keeps the `.keys` files diffable under version control,
/// like the GPG armor the layout was designed around.
pub(crate) fn wrap_to_recipient(
    recipient: &x25519::Recipient,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let encryptor = ::age::Encryptor::with_recipients(std::iter::once(
        recipient as &dyn ::age::Recipient,
    ))
    .map_err(|e| Error::CryptoProvider(format!("encrypt: {}", e)))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(::age::armor::ArmoredWriter::wrap_output(
            &mut encrypted,
            ::age::armor::Format::AsciiArmor,
        )?)
        .map_err(|e| Error::CryptoProvider(format!("encrypt: {}", e)))?;

    writer.write_all(plaintext)?;
    let armored = writer
        .finish()
        .map_err(|e| Error::CryptoProvider(format!("encrypt: {}", e)))?;
    armored
        .finish()
        .map_err(|e| Error::CryptoProvider(format!("armor: {}", e)))?;

    Ok(encrypted)
}

/// Trial-decrypt an armored blob with the given identities.
pub(crate) fn unwrap_with_identities<'a>(
    identities: impl Iterator<Item = &'a x25519::Identity>,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let reader = ::age::armor::ArmoredReader::new(ciphertext);
    let decryptor = ::age::Decryptor::new(reader)
        .map_err(|e| Error::CryptoProvider(format!("decrypt: {}", e)))?;

    let mut reader = decryptor
        .decrypt(identities.map(|i| i as &dyn ::age::Identity))
        .map_err(|e| Error::CryptoProvider(format!("decrypt: {}", e)))?;

    let mut decrypted = Vec::new();
    reader.read_to_end(&mut decrypted)?;
    Ok(decrypted)
}

/// Parse a portable public key encoding into an age recipient.
pub(crate) fn parse_public(key: &[u8]) -> Result<x25519::Recipient> {
    let text = std::str::from_utf8(key)
        .map_err(|_| Error::CryptoProvider("public key is not valid UTF-8".to_string()))?;
    text.trim()
        .parse::<x25519::Recipient>()
        .map_err(|_| Error::CryptoProvider(format!("invalid public key: {}", text.trim())))
}
