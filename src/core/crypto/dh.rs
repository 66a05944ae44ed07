//! Diffie-Hellman key agreement for `dh-ietf1024-sha256-aes128-cbc-pkcs7`.
//!
//! Group: the 1024-bit MODP prime of RFC 2409 (Oakley group 2), generator 2.
//! The AES key is HKDF-SHA256 over the 128-byte big-endian shared secret
//! with an all-zero 32-byte salt and empty info, truncated to 16 bytes:
//!
//! ```text
//! prk = HMAC(salt = [0; 32], shared)
//! key = HMAC(prk, 0x01)[..16]
//! ```

use hkdf::Hkdf;
use num_bigint::BigUint;
use rand::RngCore;
use sha2::Sha256;
use tracing::trace;
use zeroize::Zeroizing;

use super::{AesKey, KEY_LEN};
use crate::error::{CryptoError, Result};

/// Byte length of the group modulus, public values and shared secret.
pub const GROUP_LEN: usize = 128;

const GENERATOR: u32 = 2;

const SALT: [u8; 32] = [0u8; 32];

#[rustfmt::skip]
const PRIME: [u8; GROUP_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC9, 0x0F, 0xDA, 0xA2, 0x21, 0x68, 0xC2, 0x34,
    0xC4, 0xC6, 0x62, 0x8B, 0x80, 0xDC, 0x1C, 0xD1, 0x29, 0x02, 0x4E, 0x08, 0x8A, 0x67, 0xCC, 0x74,
    0x02, 0x0B, 0xBE, 0xA6, 0x3B, 0x13, 0x9B, 0x22, 0x51, 0x4A, 0x08, 0x79, 0x8E, 0x34, 0x04, 0xDD,
    0xEF, 0x95, 0x19, 0xB3, 0xCD, 0x3A, 0x43, 0x1B, 0x30, 0x2B, 0x0A, 0x6D, 0xF2, 0x5F, 0x14, 0x37,
    0x4F, 0xE1, 0x35, 0x6D, 0x6D, 0x51, 0xC2, 0x45, 0xE4, 0x85, 0xB5, 0x76, 0x62, 0x5E, 0x7E, 0xC6,
    0xF4, 0x4C, 0x42, 0xE9, 0xA6, 0x37, 0xED, 0x6B, 0x0B, 0xFF, 0x5C, 0xB6, 0xF4, 0x06, 0xB7, 0xED,
    0xEE, 0x38, 0x6B, 0xFB, 0x5A, 0x89, 0x9F, 0xA5, 0xAE, 0x9F, 0x24, 0x11, 0x7C, 0x4B, 0x1F, 0xE6,
    0x49, 0x28, 0x66, 0x51, 0xEC, 0xE6, 0x53, 0x81, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Result of the server side of the exchange.
pub struct Negotiated {
    /// Derived AES-128 key.
    pub key: AesKey,
    /// Server public value, big-endian, `GROUP_LEN` bytes.
    pub public_key: Vec<u8>,
}

/// The group modulus.
pub fn prime() -> BigUint {
    BigUint::from_bytes_be(&PRIME)
}

/// A fresh private exponent from 1024 bits of OS randomness.
pub fn generate_private() -> BigUint {
    let mut bytes = Zeroizing::new([0u8; GROUP_LEN]);
    rand::rngs::OsRng.fill_bytes(bytes.as_mut_slice());
    BigUint::from_bytes_be(bytes.as_slice())
}

/// `2^private mod p`.
pub fn public_key(private: &BigUint) -> BigUint {
    BigUint::from(GENERATOR).modpow(private, &prime())
}

/// `peer^private mod p`, with the peer value given as big-endian bytes.
pub fn shared_secret(peer_public: &[u8], private: &BigUint) -> BigUint {
    BigUint::from_bytes_be(peer_public).modpow(private, &prime())
}

/// Derive the session AES key from a shared secret.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the secret does not fit the group
/// width or HKDF rejects the output length.
pub fn derive_key(shared: &BigUint) -> Result<AesKey> {
    let shared = Zeroizing::new(to_group_bytes(shared)?);
    let hkdf = Hkdf::<Sha256>::new(Some(&SALT[..]), shared.as_slice());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    hkdf.expand(&[], key.as_mut_slice())
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(key)
}

/// Big-endian encoding left-padded to `GROUP_LEN` bytes.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if `n` is wider than the group.
pub fn to_group_bytes(n: &BigUint) -> Result<Vec<u8>> {
    let bytes = n.to_bytes_be();
    if bytes.len() > GROUP_LEN {
        return Err(CryptoError::KeyDerivation.into());
    }
    let mut padded = vec![0u8; GROUP_LEN - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}

/// Run the server side of the exchange against a client public value.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if key derivation fails.
pub fn negotiate(client_public: &[u8]) -> Result<Negotiated> {
    trace!(client_public_len = client_public.len(), "negotiating dh session key");

    let private = generate_private();
    let public = public_key(&private);
    let shared = shared_secret(client_public, &private);
    let key = derive_key(&shared)?;

    Ok(Negotiated {
        key,
        public_key: to_group_bytes(&public)?,
    })
}
