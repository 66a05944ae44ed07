//! Sessions: negotiated channels for transporting secrets.
//!
//! A session is created by `OpenSession`, owns an optional AES key and
//! encodes/decodes secrets bound to its own object path. Sessions live only
//! in memory and are never reused after `Close`.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use zeroize::Zeroizing;

use crate::core::constants::{ALGORITHM_DH, ALGORITHM_PLAIN};
use crate::core::crypto::{self, dh, AesKey};
use crate::core::types::{Secret, SessionId};
use crate::error::{Error, Result};

/// Supported session algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Plain,
    DhIetf1024Sha256Aes128CbcPkcs7,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Plain => ALGORITHM_PLAIN,
            Algorithm::DhIetf1024Sha256Aes128CbcPkcs7 => ALGORITHM_DH,
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ALGORITHM_PLAIN => Ok(Algorithm::Plain),
            ALGORITHM_DH => Ok(Algorithm::DhIetf1024Sha256Aes128CbcPkcs7),
            other => Err(Error::NotSupported(format!(
                "algorithm \"{}\" is not implemented",
                other
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `output` value returned by `OpenSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutput {
    /// Empty string variant, for `plain`.
    Plain,
    /// The server's DH public value (128 bytes, big-endian).
    PublicKey(Vec<u8>),
}

/// Outcome of negotiating an algorithm, before a session id is assigned.
pub struct Negotiation {
    pub key: Option<AesKey>,
    pub output: SessionOutput,
}

impl Algorithm {
    /// Run the key agreement for this algorithm.
    ///
    /// This is CPU-bound for the DH suite; callers on an async runtime
    /// should run it on the blocking pool.
    pub fn negotiate(self, input: &[u8]) -> Result<Negotiation> {
        match self {
            Algorithm::Plain => Ok(Negotiation {
                key: None,
                output: SessionOutput::Plain,
            }),
            Algorithm::DhIetf1024Sha256Aes128CbcPkcs7 => {
                let negotiated = dh::negotiate(input)?;
                Ok(Negotiation {
                    key: Some(negotiated.key),
                    output: SessionOutput::PublicKey(negotiated.public_key),
                })
            }
        }
    }
}

/// An open session.
pub struct Session {
    id: SessionId,
    path: String,
    key: Option<AesKey>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl Session {
    pub fn new(id: SessionId, path: String, key: Option<AesKey>) -> Self {
        Self { id, path, key }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `false` for plain sessions.
    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Encode a password as a secret bound to this session.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if encryption fails.
    pub fn encode(&self, password: &str) -> Result<Secret> {
        let (iv, payload) = crypto::encode(self.key.as_ref(), password)?;
        debug!(session = %self.id, encrypted = self.is_encrypted(), "encoding secret");
        Ok(Secret::new(self.path.clone(), iv, payload))
    }

    /// Decode a secret that was encoded under this session.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` on a bad IV, key mismatch, malformed padding or
    /// non-UTF-8 plaintext.
    pub fn decode(&self, secret: &Secret) -> Result<Zeroizing<String>> {
        debug!(session = %self.id, encrypted = self.is_encrypted(), "decoding secret");
        crypto::decode(self.key.as_ref(), &secret.parameters, &secret.value)
    }
}
