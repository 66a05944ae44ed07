//! Password encryption at rest.
//!
//! The pass-compatible store keeps every item password in its own
//! `<id>.gpg` file. `Cipher` abstracts the program doing that encryption so
//! the store can be exercised without a GnuPG keyring.
//!
//! ## Backends
//!
//! - **gpg**: Default. Shells out to the `gpg` CLI, like `pass` does.

mod gpg;

pub use gpg::Gpg;

use zeroize::Zeroizing;

use crate::error::Result;

/// Password encryption backend.
///
/// Recipients are backend-specific; for GPG they are key fingerprints,
/// key ids or email addresses as listed in the store's `.gpg-id`.
pub trait Cipher: Send + Sync {
    /// Encrypt a password for every recipient.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails.
    fn encrypt(&self, plaintext: &str, recipients: &[String]) -> Result<Vec<u8>>;

    /// Decrypt a password file's contents.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if decryption fails or the key is unavailable.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<String>>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
