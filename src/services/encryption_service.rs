use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption key secret must not be empty")]
    EmptySecret,
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid hex ciphertext: {0}")]
    InvalidCiphertext(String),
}

/// Symmetric cipher for credentials at rest (AES-256-GCM, hex-encoded
/// nonce-prefixed ciphertexts).
///
/// The key is derived exactly once, as SHA-256 of the configured secret, so
/// ciphertexts stay decryptable across restarts for as long as the secret is
/// unchanged. Construction fails when the secret is empty; there is no
/// random-key fallback.
///
/// Stateless after construction; safe to share across tasks.
#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; 32],
}

impl CredentialCipher {
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        if secret.trim().is_empty() {
            return Err(CipherError::EmptySecret);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Ok(CredentialCipher { key })
    }

    /// Encrypts a plaintext secret. An empty plaintext yields `None`, keeping
    /// "absent" distinguishable from an encrypted empty string.
    pub fn encrypt(&self, plain_text: &str) -> Result<Option<String>, CipherError> {
        if plain_text.is_empty() {
            return Ok(None);
        }
        let cipher = Aes256Gcm::new(&self.key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plain_text.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut result = nonce.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(Some(hex::encode(result)))
    }

    pub fn decrypt(&self, cipher_hex: &str) -> Result<String, CipherError> {
        let encrypted_data =
            hex::decode(cipher_hex).map_err(|e| CipherError::InvalidCiphertext(e.to_string()))?;
        if encrypted_data.len() < NONCE_SIZE {
            return Err(CipherError::InvalidCiphertext(
                "ciphertext is too short to contain a nonce".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new(&self.key.into());
        let decrypted_bytes = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(decrypted_bytes)
            .map_err(|e| CipherError::DecryptionFailed(format!("invalid UTF-8 sequence: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = CredentialCipher::new("unit-test-secret").unwrap();
        let plain_text = "This is a secret message.";

        let encrypted = cipher.encrypt(plain_text).unwrap().unwrap();
        let decrypted = cipher.decrypt(&encrypted).unwrap();

        assert_ne!(plain_text, encrypted);
        assert_eq!(plain_text, decrypted);
    }

    #[test]
    fn test_empty_plaintext_is_none() {
        let cipher = CredentialCipher::new("unit-test-secret").unwrap();
        assert!(cipher.encrypt("").unwrap().is_none());
    }

    #[test]
    fn test_same_secret_decrypts_across_instances() {
        // Simulates a process restart with an unchanged SECRET_KEY.
        let first = CredentialCipher::new("stable-secret").unwrap();
        let second = CredentialCipher::new("stable-secret").unwrap();

        let encrypted = first.encrypt("persisted credential").unwrap().unwrap();
        assert_eq!(second.decrypt(&encrypted).unwrap(), "persisted credential");
    }

    #[test]
    fn test_decrypt_with_wrong_secret() {
        let one = CredentialCipher::new("secret-one").unwrap();
        let other = CredentialCipher::new("secret-two").unwrap();

        let encrypted = one.encrypt("another secret").unwrap().unwrap();
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            CredentialCipher::new("   "),
            Err(CipherError::EmptySecret)
        ));
    }

    #[test]
    fn test_invalid_ciphertext() {
        let cipher = CredentialCipher::new("unit-test-secret").unwrap();
        assert!(cipher.decrypt("not-a-hex-cipher").is_err());
        assert!(cipher.decrypt("abcd").is_err()); // shorter than a nonce
    }
}
