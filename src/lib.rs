//! Coffer - shared encrypted secrets for small teams.
//!
//! A coffer is a plain directory (usually kept under version control) holding
//! secrets encrypted with a single symmetric key. That key is never stored in
//! the clear: it is wrapped once per registered user under the user's public
//! key, so everyone decrypts everything with only their own private key and
//! no shared password ever travels over an insecure channel.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # Bootstrap a repository
//! │   ├── identities    # add / rm / users
//! │   ├── secrets       # get / put / del / list / rotate
//! │   └── key           # Local keyring management
//! └── core/             # Core library components
//!     ├── cipher        # Symmetric cipher trait + AES-256-GCM backend
//!     ├── pki/          # Asymmetric provider capability
//!     │   ├── mod       # PkiProvider trait, fingerprints
//!     │   ├── age       # age x25519 keyring implementation
//!     │   └── memory    # In-memory provider (test double)
//!     ├── envelope      # Active-key lifecycle: wrap, unwrap, rotate
//!     ├── registry      # Registered-identity bookkeeping
//!     ├── store         # Encrypted secret files under the root
//!     ├── repo/         # Repository facade + bootstrapper
//!     └── config        # User-level configuration
//! ```
//!
//! # Features
//!
//! - Envelope encryption: age x25519 wraps, AES-256-GCM payloads
//! - Add a user without re-encrypting anything
//! - Remove a user with key rotation and bulk re-encryption
//! - Plain-file layout that diffs cleanly in version control

pub mod cli;
pub mod core;
pub mod error;
