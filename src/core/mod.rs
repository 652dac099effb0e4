//! Core library components.
//!
//! This module contains the reusable business logic for envelope key
//! management, identity registration, and encrypted secret storage.

pub mod cipher;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod paths;
pub mod pki;
pub mod registry;
pub mod repo;
pub mod store;

pub use repo::Repository;
