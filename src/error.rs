//! Error types.
//!
//! `Error` carries the named protocol conditions callers see on the wire
//! (`NotSupported`, `NoSuchObject`, `NoSession`, `IsLocked`) next to the
//! layered failures of the collaborators underneath them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("no such object: {0}")]
    NoSuchObject(String),

    #[error("no such session: {0}")]
    NoSession(String),

    /// Never raised: locking is not enforced.
    #[error("object is locked: {0}")]
    IsLocked(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("background task failed: {0}")]
    Worker(String),
}

impl Error {
    /// The D-Bus error name this error is reported under.
    pub fn dbus_name(&self) -> &'static str {
        match self {
            Error::NotSupported(_) => "org.freedesktop.DBus.Error.NotSupported",
            Error::NoSuchObject(_) => "org.freedesktop.Secret.Error.NoSuchObject",
            Error::NoSession(_) => "org.freedesktop.Secret.Error.NoSession",
            Error::IsLocked(_) => "org.freedesktop.Secret.Error.IsLocked",
            Error::InvalidArgument(_) => "org.freedesktop.DBus.Error.InvalidArgs",
            _ => "org.freedesktop.DBus.Error.Failed",
        }
    }
}

/// Failures of the session transport crypto.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid key or iv length")]
    InvalidLength,

    #[error("decryption failed: bad key or padding")]
    Padding,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failures of the password store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found in store: {0}")]
    NotFound(String),

    #[error("no {file} found for {path}: run `pass init <gpg-id>` first")]
    NoGpgId { file: &'static str, path: String },

    #[error("could not generate a free identifier after {0} attempts")]
    IdentifierExhausted(usize),
}

/// Failures of the password cipher.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("{0} not found. Install GnuPG from https://gnupg.org/download/")]
    NotInstalled(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Failures loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unable to determine home directory")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, Error>;
