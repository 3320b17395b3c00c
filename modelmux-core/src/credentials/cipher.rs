//! Secret-at-rest encryption.
//!
//! Keys are derived with Argon2id from a machine identifier and a random salt
//! persisted next to the secrets file. Values are sealed with AES-256-GCM and
//! stored as `base64(nonce || ciphertext)`.

use super::CredentialError;
use crate::config::constants::credentials as params;
use crate::utils::write_private_file;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

pub type DerivedKey = [u8; params::KEY_LEN];

/// Derive the symmetric key for this machine.
pub fn derive_key(machine_id: &[u8], salt: &[u8]) -> Result<DerivedKey, CredentialError> {
    let argon_params = Params::new(
        params::KDF_MEMORY_KIB,
        params::KDF_TIME_COST,
        params::KDF_PARALLELISM,
        Some(params::KEY_LEN),
    )
    .map_err(|err| CredentialError::Crypto(format!("invalid KDF parameters: {err}")))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let password = Sha256::digest(machine_id);
    let mut key = [0u8; params::KEY_LEN];
    argon
        .hash_password_into(&password, salt, &mut key)
        .map_err(|err| CredentialError::Crypto(format!("key derivation failed: {err}")))?;
    Ok(key)
}

/// Read the stored salt, generating and persisting one on first use.
pub fn load_or_create_salt(path: &Path) -> Result<Vec<u8>, CredentialError> {
    if path.exists() {
        let salt = fs::read(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Regenerating would orphan every stored secret
        if salt.len() != params::SALT_LEN {
            return Err(CredentialError::EncryptionUnavailable(format!(
                "salt file {} has unexpected length {}",
                path.display(),
                salt.len()
            )));
        }
        return Ok(salt);
    }

    let mut salt = vec![0u8; params::SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    write_private_file(path, &salt).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "generated credential salt");
    Ok(salt)
}

/// Best-effort stable identifier for the current machine and user.
pub fn machine_id() -> Option<String> {
    for candidate in params::MACHINE_ID_PATHS {
        if let Ok(contents) = fs::read_to_string(candidate) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    let home = dirs::home_dir()?;
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();
    Some(format!("{}:{}", home.display(), user))
}

pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretCipher { .. }")
    }
}

impl SecretCipher {
    pub fn from_key(key: &DerivedKey) -> Result<Self, CredentialError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|err| CredentialError::Crypto(err.to_string()))?;
        Ok(Self { cipher })
    }

    /// Build the cipher from the salt file and a machine identifier.
    pub fn initialize(salt_path: &Path, machine_id: &str) -> Result<Self, CredentialError> {
        if machine_id.trim().is_empty() {
            return Err(CredentialError::EncryptionUnavailable(
                "machine identifier is empty".to_string(),
            ));
        }
        let salt = load_or_create_salt(salt_path)?;
        let key = derive_key(machine_id.as_bytes(), &salt)?;
        Self::from_key(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        let mut nonce_bytes = [0u8; params::NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CredentialError::Crypto("encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(params::NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CredentialError> {
        let sealed = STANDARD
            .decode(encoded.trim())
            .map_err(|err| CredentialError::Crypto(format!("invalid encoding: {err}")))?;
        if sealed.len() <= params::NONCE_LEN {
            return Err(CredentialError::Crypto("ciphertext too short".to_string()));
        }

        let (nonce, ciphertext) = sealed.split_at(params::NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Crypto("authentication tag mismatch".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| CredentialError::Crypto("decrypted value is not UTF-8".to_string()))
    }
}
