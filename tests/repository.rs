//! Repository lifecycle integration tests.
//!
//! Bootstrap preconditions, secret round-trips, listing rules, and the
//! register/deregister access-control contract.

mod support;

use std::fs;

use coffer::core::pki::{MemoryPki, PkiProvider};
use coffer::core::Repository;
use coffer::error::Error;
use support::{bootstrap, share_public};
use tempfile::TempDir;

// --- Bootstrap ---

#[test]
fn test_bootstrap_creates_one_envelope_per_identity() {
    let (_tmp, repo) = bootstrap(&["alice", "bob"]);

    let identities = repo.list_identities().unwrap();
    assert_eq!(identities.len(), 2);

    for fingerprint in &identities {
        let key_dir = repo.root().join(".keys");
        assert!(key_dir.join(format!("{}.key", fingerprint)).is_file());
        assert!(key_dir.join(format!("{}.pub", fingerprint)).is_file());
    }
}

#[test]
fn test_bootstrap_refuses_non_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("repo");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("existing"), b"data").unwrap();

    let provider = MemoryPki::new();
    provider.generate("alice");

    let err = Repository::bootstrap(&root, provider, &["alice"]).unwrap_err();
    assert!(matches!(err, Error::DirectoryNotEmpty(_)));
}

#[test]
fn test_bootstrap_refuses_empty_identity_list() {
    let tmp = TempDir::new().unwrap();
    let provider = MemoryPki::new();

    let err =
        Repository::bootstrap(tmp.path().join("repo"), provider, &[] as &[&str]).unwrap_err();
    assert!(matches!(err, Error::NoIdentities));
}

#[test]
fn test_open_requires_bootstrap() {
    let tmp = TempDir::new().unwrap();
    let err = Repository::open(tmp.path(), MemoryPki::new()).unwrap_err();
    assert!(matches!(err, Error::NotInitialized(_)));
}

// --- Secret round-trips ---

#[test]
fn test_put_get_roundtrip() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    let payload = br#"{"u":"a","p":"1234"}"#;
    repo.put("secret1", payload).unwrap();
    assert_eq!(repo.get("secret1").unwrap(), payload);
}

#[test]
fn test_put_overwrites_without_merge() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    repo.put("db/password", b"first").unwrap();
    repo.put("db/password", b"second").unwrap();
    assert_eq!(repo.get("db/password").unwrap(), b"second");
}

#[test]
fn test_get_missing_secret() {
    let (_tmp, repo) = bootstrap(&["alice"]);
    assert!(matches!(
        repo.get("nope").unwrap_err(),
        Error::SecretNotFound(_)
    ));
}

#[test]
fn test_delete_secret() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    repo.put("ephemeral", b"data").unwrap();
    repo.delete("ephemeral").unwrap();

    assert!(matches!(
        repo.get("ephemeral").unwrap_err(),
        Error::SecretNotFound(_)
    ));
    assert!(matches!(
        repo.delete("ephemeral").unwrap_err(),
        Error::SecretNotFound(_)
    ));
}

#[test]
fn test_stored_file_is_not_plaintext() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    repo.put("account-1", b"hunter2-hunter2-hunter2").unwrap();
    let raw = fs::read(repo.root().join("account-1")).unwrap();
    assert!(!raw
        .windows(7)
        .any(|window| window == b"hunter2"));
}

// --- Listing ---

#[test]
fn test_listing_is_recursive_and_excludes_reserved_names() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    repo.put("account-1", b"a").unwrap();
    repo.put("db/prod/password", b"b").unwrap();

    // Reserved patterns dropped directly into the tree.
    fs::write(repo.root().join(".hidden"), b"x").unwrap();
    fs::write(repo.root().join("backup~"), b"x").unwrap();

    let mut names = repo
        .list_secrets()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names.sort();

    assert_eq!(names, vec!["account-1", "db/prod/password"]);
}

#[test]
fn test_listing_never_returns_key_material() {
    let (_tmp, repo) = bootstrap(&["alice"]);
    repo.put("only", b"payload").unwrap();

    for name in repo.list_secrets() {
        let name = name.unwrap();
        assert!(!name.contains(".keys"), "leaked key file: {}", name);
    }
}

// --- Path safety ---

#[test]
fn test_path_traversal_is_rejected() {
    let (_tmp, repo) = bootstrap(&["alice"]);

    for name in ["../escape", "a/../../escape", "/etc/passwd", ".keys/steal", "x~", ""] {
        let err = repo.put(name, b"payload").unwrap_err();
        assert!(
            matches!(err, Error::InvalidPath(_)),
            "{:?} should be invalid",
            name
        );
    }
}

// --- Envelope consistency ---

#[test]
fn test_all_registered_identities_unwrap_the_same_key() {
    let (_tmp, repo) = bootstrap(&["alice", "bob"]);

    let identities = repo.list_identities().unwrap();
    let envelope = repo.envelope();
    let first = envelope.unwrap_as(&identities[0]).unwrap();
    let second = envelope.unwrap_as(&identities[1]).unwrap();
    assert_eq!(first, second);
}

// --- Access control ---

#[test]
fn test_registered_identity_can_read_preexisting_secrets() {
    let alice = MemoryPki::new();
    alice.generate("alice");

    let tmp = TempDir::new().unwrap();
    let repo = Repository::bootstrap(tmp.path().join("repo"), alice, &["alice"]).unwrap();
    repo.put("secret1", b"before bob existed").unwrap();

    // Bob shows up with his own key pair; alice's provider learns only
    // his public key, so he is registered by fingerprint.
    let bob = MemoryPki::new();
    bob.generate("bob");
    let bob_fpr = share_public(&bob, "bob", repo.provider());
    repo.add_identity(bob_fpr.as_str()).unwrap();

    // Bob opens the same directory with only his own provider.
    let bob_repo = Repository::open(repo.root(), bob).unwrap();
    assert_eq!(bob_repo.get("secret1").unwrap(), b"before bob existed");
}

#[test]
fn test_add_identity_by_full_public_key() {
    let alice = MemoryPki::new();
    alice.generate("alice");
    let tmp = TempDir::new().unwrap();
    let repo = Repository::bootstrap(tmp.path().join("repo"), alice, &["alice"]).unwrap();
    repo.put("secret1", b"payload").unwrap();

    let bob = MemoryPki::new();
    let bob_fpr = bob.generate("bob");
    let exported = bob.export_public(&bob_fpr).unwrap();
    repo.provider().import_public(&exported).unwrap();

    // The exported key text itself is a valid reference.
    let key_str = String::from_utf8(exported).unwrap();
    assert_eq!(repo.add_identity(key_str.trim()).unwrap(), bob_fpr);

    let bob_repo = Repository::open(repo.root(), bob).unwrap();
    assert_eq!(bob_repo.get("secret1").unwrap(), b"payload");
}

#[test]
fn test_end_to_end_register_deregister_scenario() {
    // Bootstrap with alice only.
    let alice = MemoryPki::new();
    alice.generate("alice");
    let tmp = TempDir::new().unwrap();
    let repo = Repository::bootstrap(tmp.path().join("repo"), alice, &["alice"]).unwrap();

    let payload = br#"{"u":"a","p":"1234"}"#;
    repo.put("secret1", payload).unwrap();
    assert_eq!(repo.get("secret1").unwrap(), payload);

    // Register bob by the fingerprint his exported key lands under; he
    // can then read the existing secret.
    let bob = MemoryPki::new();
    bob.generate("bob");
    let bob_fpr = share_public(&bob, "bob", repo.provider());
    repo.add_identity(bob_fpr.as_str()).unwrap();

    let bob_repo = Repository::open(repo.root(), bob).unwrap();
    assert_eq!(bob_repo.get("secret1").unwrap(), payload);

    // Deregister bob; the key rotates.
    repo.remove_identity(bob_fpr.as_str()).unwrap();

    // Bob can no longer unwrap anything: his envelope is gone and the
    // remaining envelopes are under the new key.
    assert!(matches!(
        bob_repo.get("secret1").unwrap_err(),
        Error::NoUsableKey
    ));
    let identities = repo.list_identities().unwrap();
    assert!(matches!(
        bob_repo.envelope().unwrap_as(&identities[0]).unwrap_err(),
        Error::CryptoProvider(_)
    ));

    // Alice still reads the original value.
    assert_eq!(repo.get("secret1").unwrap(), payload);
}

#[test]
fn test_add_identity_twice_is_rejected() {
    let (_tmp, repo) = bootstrap(&["alice"]);
    assert!(matches!(
        repo.add_identity("alice").unwrap_err(),
        Error::AlreadyRegistered(_)
    ));
}

#[test]
fn test_remove_last_identity_is_refused() {
    let (_tmp, repo) = bootstrap(&["alice"]);
    assert!(matches!(
        repo.remove_identity("alice").unwrap_err(),
        Error::LastIdentity(_)
    ));
    // Repository still works.
    repo.put("still-works", b"yes").unwrap();
    assert_eq!(repo.get("still-works").unwrap(), b"yes");
}

#[test]
fn test_unknown_reference_does_not_resolve() {
    let (_tmp, repo) = bootstrap(&["alice"]);
    assert!(matches!(
        repo.add_identity("mallory").unwrap_err(),
        Error::UnknownIdentity(_)
    ));
    assert!(matches!(
        repo.remove_identity("mallory").unwrap_err(),
        Error::UnknownIdentity(_)
    ));
}
