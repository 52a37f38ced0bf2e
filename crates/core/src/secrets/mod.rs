//! Encryption of third-party credentials at rest.

use crate::errors::Result;

/// Symmetric cipher for OAuth and API tokens stored in the database.
///
/// Implementations return an opaque, self-describing string (nonce plus
/// ciphertext) so rows can be decrypted without extra columns.
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Pass-through cipher for tests and local tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl TokenCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
