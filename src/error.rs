use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not a coffer repository: {0}")]
    NotInitialized(String),

    #[error("destination directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("identity reference is ambiguous: {0}")]
    AmbiguousIdentity(String),

    #[error("identity already registered: {0}")]
    AlreadyRegistered(String),

    #[error("bootstrap requires at least one identity")]
    NoIdentities,

    #[error("no active symmetric key: repository has not been bootstrapped")]
    NoActiveKey,

    #[error("no usable key: no registered identity has a local private key")]
    NoUsableKey,

    #[error("removing {0} would leave the repository with no registered identities")]
    LastIdentity(String),

    #[error("crypto provider error: {0}")]
    CryptoProvider(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("invalid secret name: {0}")]
    InvalidPath(String),

    #[error(
        "rotation incomplete: {} secret(s) still under the old key: {}",
        failed_names.len(),
        failed_names.join(", ")
    )]
    RotationIncomplete { failed_names: Vec<String> },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
