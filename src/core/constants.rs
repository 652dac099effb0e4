//! Constants used throughout coffer.
//!
//! Centralizes magic strings and reserved file patterns.

/// Key directory inside the repository root (`.keys`).
pub const KEY_DIR: &str = ".keys";

/// Extension of a wrapped symmetric key file (`<fingerprint>.key`).
pub const WRAPPED_KEY_EXT: &str = "key";

/// Extension of an exported public key file (`<fingerprint>.pub`).
pub const PUBLIC_KEY_EXT: &str = "pub";

/// Suffix reserved for backup/swap files; excluded from secret listing.
///
/// The store also writes through a `~`-suffixed sibling before renaming,
/// which is why these names are reserved.
pub const BACKUP_SUFFIX: char = '~';

/// Prefix marking hidden entries; excluded from secret listing.
pub const HIDDEN_PREFIX: char = '.';

/// Extension of a private identity file in the local keyring.
pub const IDENTITY_EXT: &str = "identity";

/// Subdirectory of the keyring holding imported public keys.
pub const IMPORTED_DIR: &str = "imported";
