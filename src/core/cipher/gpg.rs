//! GPG cipher backend.
//!
//! Encrypts item passwords using GnuPG, producing the same binary
//! `.gpg` files `pass` writes.
//!
//! ## Requirements
//!
//! - `gpg` CLI must be installed (or configured via `[store] gpg`)
//! - The keyring must hold the public keys listed in `.gpg-id`
//! - The private key must be available (typically via gpg-agent) to decrypt

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::trace;
use zeroize::Zeroizing;

use super::Cipher;
use crate::error::{CipherError, Result};

/// GPG cipher backend using the gpg CLI.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: String,
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl Gpg {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the gpg executable can be found.
    pub fn check(&self) -> Result<()> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| CipherError::NotInstalled(self.program.clone()).into())
    }

    /// Spawn gpg with `args`, feed `input` on stdin and collect stdout.
    fn run(&self, args: &[&str], input: &[u8]) -> std::result::Result<Vec<u8>, String> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", self.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| format!("no stdin for {}", self.program))?;

        // Feed stdin while stdout and stderr drain, so neither side can
        // stall on a full pipe. The pipe closes when the writer returns.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| format!("{} command failed: {}", self.program, e))?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        written
            .map_err(|_| format!("writer for {} panicked", self.program))?
            .map_err(|e| format!("failed to write to {}: {}", self.program, e))?;
        Ok(output.stdout)
    }
}

impl Cipher for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn encrypt(&self, plaintext: &str, recipients: &[String]) -> Result<Vec<u8>> {
        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting with GPG"
        );

        self.check()?;

        if recipients.is_empty() {
            return Err(CipherError::EncryptionFailed("no recipients provided".to_string()).into());
        }

        let mut args = vec![
            "--encrypt",
            "--trust-model",
            "always",
            "--batch",
            "--yes",
            "--quiet",
        ];
        for recipient in recipients {
            args.extend(["--recipient", recipient.as_str()]);
        }

        let ciphertext = self
            .run(&args, plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(format!("gpg encrypt failed: {}", e)))?;

        trace!(ciphertext_len = ciphertext.len(), "encrypted with GPG");
        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<String>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with GPG");

        self.check()?;

        let plaintext = self
            .run(&["--decrypt", "--batch", "--yes", "--quiet"], ciphertext)
            .map_err(|e| {
                CipherError::DecryptionFailed(format!(
                    "gpg decrypt failed: {}. Ensure you have the private key in your keyring.",
                    e
                ))
            })?;
        let plaintext = Zeroizing::new(plaintext);

        let password = String::from_utf8(plaintext.to_vec())
            .map_err(|e| CipherError::DecryptionFailed(format!("UTF-8 error: {}", e)))?;

        trace!(plaintext_len = password.len(), "decrypted with GPG");
        Ok(Zeroizing::new(password))
    }
}
