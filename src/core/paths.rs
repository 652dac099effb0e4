//! Repository layout helpers.
//!
//! The on-disk layout is part of the compatibility contract:
//!
//! ```text
//! <root>/
//!   .keys/
//!     <fingerprint>.key   # wrapped symmetric key for that identity
//!     <fingerprint>.pub   # exported public key for that identity
//!   <secret files, arbitrary relative paths>
//! ```

use std::path::{Path, PathBuf};

use crate::core::constants;
use crate::core::pki::Fingerprint;

/// The `.keys` directory under the repository root.
pub fn key_dir(root: &Path) -> PathBuf {
    root.join(constants::KEY_DIR)
}

/// Path of an identity's wrapped symmetric key.
pub fn wrapped_key(root: &Path, fingerprint: &Fingerprint) -> PathBuf {
    key_dir(root).join(format!(
        "{}.{}",
        fingerprint,
        constants::WRAPPED_KEY_EXT
    ))
}

/// Path of an identity's exported public key.
pub fn public_key(root: &Path, fingerprint: &Fingerprint) -> PathBuf {
    key_dir(root).join(format!(
        "{}.{}",
        fingerprint,
        constants::PUBLIC_KEY_EXT
    ))
}
