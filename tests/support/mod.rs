//! Test support utilities for coffer integration tests.
//!
//! Library tests run fully in-process against the in-memory PKI provider;
//! CLI tests drive the real binary with isolated home/keyring directories.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Output;

use coffer::core::pki::{Fingerprint, MemoryPki, PkiProvider};
use coffer::core::Repository;
use tempfile::TempDir;

/// Bootstrap a repository for the given user names.
///
/// One shared provider holds every user's private identity, which is the
/// convenient shape for single-process tests; multi-user scenarios build
/// their own providers.
pub fn bootstrap(names: &[&str]) -> (TempDir, Repository<MemoryPki>) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let provider = MemoryPki::new();
    for name in names {
        provider.generate(name);
    }

    let repo = Repository::bootstrap(tmp.path().join("repo"), provider, names)
        .expect("failed to bootstrap repository");
    (tmp, repo)
}

/// Hand one user's public key to another user's provider.
///
/// Names never travel between providers; the returned fingerprint is the
/// only reference the receiving side can resolve.
pub fn share_public(from: &MemoryPki, reference: &str, to: &MemoryPki) -> Fingerprint {
    let fingerprint = from.resolve(reference).expect("unknown identity");
    let exported = from.export_public(&fingerprint).expect("export failed");
    to.import_public(&exported).expect("import failed")
}

/// CLI test environment with isolated project and home directories.
///
/// No process-global state is mutated; child processes get their own
/// `HOME`, config dir, and keyring via environment variables.
pub struct Test {
    pub dir: TempDir,
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            home: TempDir::new().expect("failed to create temp home"),
        }
    }

    pub fn repo_path(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Build a `coffer` command with the isolated environment applied.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("coffer").expect("binary exists");
        cmd.current_dir(self.dir.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("COFFER_KEYRING", self.home.path().join("keyring"))
            .env("NO_COLOR", "1");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().expect("failed to run coffer")
    }

    /// Keygen + init in one step.
    pub fn init(name: &str) -> Self {
        let t = Self::new();
        let keygen = t.run(&["key", "keygen", name]);
        assert!(
            keygen.status.success(),
            "keygen failed: {}",
            String::from_utf8_lossy(&keygen.stderr)
        );

        let repo = t.repo_path();
        let init = t.run(&["init", "-i", name, "-C", repo.to_str().unwrap()]);
        assert!(
            init.status.success(),
            "init failed: {}",
            String::from_utf8_lossy(&init.stderr)
        );
        t
    }

    /// Run a subcommand against the test repository.
    pub fn repo_run(&self, args: &[&str]) -> Output {
        let repo = self.repo_path();
        let mut full = vec!["-C", repo.to_str().unwrap()];
        full.extend_from_slice(args);
        self.run(&full)
    }
}
