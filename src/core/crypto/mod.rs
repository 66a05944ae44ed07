//! Secret transport crypto.
//!
//! Encodes and decodes secret payloads under a session's negotiated key:
//! AES-128-CBC with PKCS#7 padding and a fresh random IV per secret.
//! A session without a key ("plain") passes UTF-8 bytes through unchanged.
//!
//! Key agreement lives in [`dh`].

pub mod dh;

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// AES-128 key length in bytes.
pub const KEY_LEN: usize = 16;

/// CBC initialization vector length in bytes.
pub const IV_LEN: usize = 16;

/// A negotiated session key.
pub type AesKey = Zeroizing<[u8; KEY_LEN]>;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encode a password for transport.
///
/// # Returns
///
/// `(iv, payload)`. Both are produced fresh on every call; `iv` is empty
/// when `key` is `None`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidLength` if the cipher rejects the key.
pub fn encode(key: Option<&AesKey>, password: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let Some(key) = key else {
        return Ok((Vec::new(), password.as_bytes().to_vec()));
    };

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let encryptor = Aes128CbcEnc::new_from_slices(key.as_slice(), &iv)
        .map_err(|_| CryptoError::InvalidLength)?;
    let payload = encryptor.encrypt_padded_vec_mut::<Pkcs7>(password.as_bytes());

    trace!(
        plaintext_len = password.len(),
        payload_len = payload.len(),
        "encoded secret"
    );
    Ok((iv.to_vec(), payload))
}

/// Decode a transported payload back into a password.
///
/// # Errors
///
/// Returns `CryptoError::InvalidLength` for an IV that is not 16 bytes,
/// `CryptoError::Padding` when the key does not match or the padding is
/// malformed, and `CryptoError::Utf8` when the plaintext is not UTF-8.
pub fn decode(key: Option<&AesKey>, iv: &[u8], payload: &[u8]) -> Result<Zeroizing<String>> {
    let plaintext = match key {
        None => payload.to_vec(),
        Some(key) => {
            let decryptor = Aes128CbcDec::new_from_slices(key.as_slice(), iv)
                .map_err(|_| CryptoError::InvalidLength)?;
            decryptor
                .decrypt_padded_vec_mut::<Pkcs7>(payload)
                .map_err(|_| CryptoError::Padding)?
        }
    };

    trace!(payload_len = payload.len(), "decoded secret");
    let password = String::from_utf8(plaintext).map_err(CryptoError::Utf8)?;
    Ok(Zeroizing::new(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn key(byte: u8) -> AesKey {
        Zeroizing::new([byte; KEY_LEN])
    }

    #[test]
    fn test_plain_passes_bytes_through() {
        let (iv, payload) = encode(None, "password").unwrap();
        assert!(iv.is_empty());
        assert_eq!(payload, b"password");
        assert_eq!(decode(None, &iv, &payload).unwrap().as_str(), "password");
    }

    #[test]
    fn test_keyed_roundtrip() {
        let key = key(7);
        for password in ["", "a", "exactly sixteen!", "ünïcödé pässwörd with some length"] {
            let (iv, payload) = encode(Some(&key), password).unwrap();
            assert_eq!(iv.len(), IV_LEN);
            assert_eq!(payload.len() % 16, 0);
            assert!(payload.len() > password.len());
            assert_eq!(decode(Some(&key), &iv, &payload).unwrap().as_str(), password);
        }
    }

    #[test]
    fn test_keyed_encode_uses_fresh_iv() {
        let key = key(1);
        let (iv1, payload1) = encode(Some(&key), "same").unwrap();
        let (iv2, payload2) = encode(Some(&key), "same").unwrap();
        assert_ne!(iv1, iv2);
        assert_ne!(payload1, payload2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let (iv, payload) = encode(Some(&key(1)), "secret value").unwrap();
        match decode(Some(&key(2)), &iv, &payload) {
            // A wrong key almost always breaks the padding; when it does not,
            // the garbage plaintext is not the original.
            Ok(decoded) => assert_ne!(decoded.as_str(), "secret value"),
            Err(e) => assert!(matches!(e, Error::Crypto(_))),
        }
    }

    #[test]
    fn test_bad_iv_length() {
        let result = decode(Some(&key(1)), &[0u8; 4], &[0u8; 16]);
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::InvalidLength))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let (iv, payload) = encode(Some(&key(3)), "hello").unwrap();
        let result = decode(Some(&key(3)), &iv, &payload[..payload.len() - 1]);
        assert!(matches!(result, Err(Error::Crypto(CryptoError::Padding))));
    }
}
