//! Keys derived from the master secret, and encryption of stored tokens.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use vuka_core::{errors::Error, secrets::TokenCipher, Result};

const CIPHER_VERSION: &str = "v1";
const JWT_KEY_INFO: &[u8] = b"vuka/jwt-signing";
const TOKEN_KEY_INFO: &[u8] = b"vuka/token-encryption";

/// Master secret and the purpose-specific keys derived from it.
pub struct KeyRing {
    master: [u8; 32],
}

impl KeyRing {
    pub fn from_secret(raw: &str) -> Result<Self> {
        Ok(Self {
            master: decode_secret_key(raw)?,
        })
    }

    fn derive(&self, info: &[u8]) -> Result<[u8; 32]> {
        let hk = Hkdf::<Sha256>::new(None, &self.master);
        let mut okm = [0u8; 32];
        hk.expand(info, &mut okm)
            .map_err(|e| Error::Secret(format!("Key derivation failed: {e}")))?;
        Ok(okm)
    }

    pub fn jwt_secret(&self) -> Result<[u8; 32]> {
        self.derive(JWT_KEY_INFO)
    }

    pub fn token_cipher(&self) -> Result<ChaChaTokenCipher> {
        Ok(ChaChaTokenCipher {
            key: self.derive(TOKEN_KEY_INFO)?,
        })
    }
}

/// ChaCha20-Poly1305 with a random nonce per value. Output is
/// `v1:<base64 nonce>:<base64 ciphertext>`.
pub struct ChaChaTokenCipher {
    key: [u8; 32],
}

impl TokenCipher for ChaChaTokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| Error::Secret("Failed to encrypt token".into()))?;
        Ok(format!(
            "{}:{}:{}",
            CIPHER_VERSION,
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext)
        ))
    }

    fn decrypt(&self, stored: &str) -> Result<String> {
        let mut parts = stored.splitn(3, ':');
        let (Some(CIPHER_VERSION), Some(nonce), Some(ciphertext)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Secret("Unrecognised token format".into()));
        };
        let nonce = BASE64
            .decode(nonce)
            .map_err(|e| Error::Secret(format!("Failed to decode nonce: {e}")))?;
        if nonce.len() != 12 {
            return Err(Error::Secret("Token nonce has the wrong length".into()));
        }
        let ciphertext = BASE64
            .decode(ciphertext)
            .map_err(|e| Error::Secret(format!("Failed to decode ciphertext: {e}")))?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| Error::Secret("Failed to decrypt token".into()))?;
        String::from_utf8(plaintext).map_err(|_| Error::Secret("Token is not UTF-8".into()))
    }
}

fn decode_secret_key(raw: &str) -> Result<[u8; 32]> {
    let trimmed = raw.trim();
    let decoded = match BASE64.decode(trimmed) {
        Ok(bytes) if bytes.len() == 32 => bytes,
        _ if trimmed.len() == 32 => trimmed.as_bytes().to_vec(),
        _ => {
            return Err(Error::Secret(
                "VUKA_SECRET_KEY must be a base64 string or 32-byte ascii value".into(),
            ))
        }
    };

    let mut key = [0u8; 32];
    key.copy_from_slice(&decoded);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> KeyRing {
        KeyRing::from_secret(&BASE64.encode([7u8; 32])).unwrap()
    }

    #[test]
    fn accepts_base64_or_ascii_secret() {
        assert!(KeyRing::from_secret(&BASE64.encode([1u8; 32])).is_ok());
        assert!(KeyRing::from_secret("0123456789abcdef0123456789abcdef").is_ok());
        assert!(KeyRing::from_secret("too-short").is_err());
        assert!(KeyRing::from_secret(&BASE64.encode([1u8; 16])).is_err());
    }

    #[test]
    fn derived_keys_differ_by_purpose() {
        let ring = ring();
        assert_ne!(ring.jwt_secret().unwrap(), ring.token_cipher().unwrap().key);
        assert_eq!(ring.jwt_secret().unwrap(), ring.jwt_secret().unwrap());
    }

    #[test]
    fn token_round_trip_uses_fresh_nonces() {
        let cipher = ring().token_cipher().unwrap();
        let a = cipher.encrypt("xero-access-token").unwrap();
        let b = cipher.encrypt("xero-access-token").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("v1:"));
        assert!(!a.contains("xero-access-token"));
        assert_eq!(cipher.decrypt(&a).unwrap(), "xero-access-token");
    }

    #[test]
    fn rejects_tampering_and_foreign_keys() {
        let cipher = ring().token_cipher().unwrap();
        let stored = cipher.encrypt("secret").unwrap();

        let mut tampered = stored.clone();
        tampered.pop();
        tampered.push(if stored.ends_with('A') { 'B' } else { 'A' });
        assert!(cipher.decrypt(&tampered).is_err());

        let other = KeyRing::from_secret(&BASE64.encode([9u8; 32]))
            .unwrap()
            .token_cipher()
            .unwrap();
        assert!(other.decrypt(&stored).is_err());
        assert!(cipher.decrypt("plain-token").is_err());
    }
}
