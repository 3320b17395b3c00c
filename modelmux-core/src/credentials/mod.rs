//! Encrypted secret persistence for provider credentials.
//!
//! Secrets live in a flat JSON map (`credentials.json`) keyed by provider
//! name. When a cipher can be initialized the values are sealed with
//! AES-256-GCM; otherwise they are stored as plaintext and a warning is
//! emitted once per process. Both files are written owner-only.
//!
//! A stored value that fails to decrypt is returned as-is: installs that
//! predate encryption kept plaintext secrets in the same file, and those must
//! keep working after an upgrade.

pub mod cipher;
pub mod format;

pub use cipher::{SecretCipher, derive_key};
pub use format::{infer_kind, validate_format};

use crate::config::constants::credentials as params;
use crate::utils::write_private_file;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse credential file {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed credential: {0}")]
    Malformed(String),
    #[error("Encryption unavailable: {0}")]
    EncryptionUnavailable(String),
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// How a secret ended up on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Encrypted,
    Plaintext,
}

static PLAINTEXT_WARNING_EMITTED: AtomicBool = AtomicBool::new(false);

/// Log the plaintext-storage warning the first time it is needed.
///
/// Returns `true` only for the call that actually emitted it.
pub fn warn_plaintext_storage_once() -> bool {
    if PLAINTEXT_WARNING_EMITTED.swap(true, Ordering::SeqCst) {
        return false;
    }
    tracing::warn!(
        "secret encryption is unavailable; provider credentials are stored as plaintext"
    );
    true
}

#[derive(Debug)]
pub struct CredentialStore {
    secrets_path: PathBuf,
    cipher: Option<SecretCipher>,
}

impl CredentialStore {
    /// Open the store in `dir`, encrypting when `encrypt` is set and a cipher can be built.
    pub fn open(dir: impl AsRef<Path>, encrypt: bool) -> Self {
        if !encrypt {
            return Self::plaintext(dir);
        }
        match cipher::machine_id() {
            Some(machine_id) => Self::open_with_machine_id(dir, &machine_id),
            None => {
                tracing::warn!("could not determine a machine identifier for key derivation");
                Self::plaintext(dir)
            }
        }
    }

    /// Open with an explicit machine identifier as key material.
    pub fn open_with_machine_id(dir: impl AsRef<Path>, machine_id: &str) -> Self {
        let dir = dir.as_ref();
        let cipher = match SecretCipher::initialize(&dir.join(params::SALT_FILE_NAME), machine_id)
        {
            Ok(cipher) => Some(cipher),
            Err(err) => {
                tracing::warn!(error = %err, "credential encryption disabled");
                None
            }
        };
        Self {
            secrets_path: dir.join(params::SECRETS_FILE_NAME),
            cipher,
        }
    }

    /// Open without encryption.
    pub fn plaintext(dir: impl AsRef<Path>) -> Self {
        Self {
            secrets_path: dir.as_ref().join(params::SECRETS_FILE_NAME),
            cipher: None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn secrets_path(&self) -> &Path {
        &self.secrets_path
    }

    /// Persist `secret` under `id`, replacing any previous value.
    pub fn store(&self, id: &str, secret: &str) -> Result<StoreOutcome, CredentialError> {
        if id.trim().is_empty() {
            return Err(CredentialError::Malformed(
                "provider id cannot be empty".to_string(),
            ));
        }
        if secret.trim().is_empty() {
            return Err(CredentialError::Malformed(format!(
                "secret for '{id}' is empty"
            )));
        }

        let (stored, outcome) = match &self.cipher {
            Some(cipher) => (cipher.encrypt(secret)?, StoreOutcome::Encrypted),
            None => {
                warn_plaintext_storage_once();
                (secret.to_string(), StoreOutcome::Plaintext)
            }
        };

        let mut secrets = self.load_map()?;
        secrets.insert(id.to_string(), stored);
        self.save_map(&secrets)?;
        tracing::debug!(provider = id, ?outcome, "stored credential");
        Ok(outcome)
    }

    /// Look up the secret stored under `id`.
    pub fn retrieve(&self, id: &str) -> Result<Option<String>, CredentialError> {
        let secrets = self.load_map()?;
        let Some(stored) = secrets.get(id) else {
            return Ok(None);
        };

        let Some(cipher) = &self.cipher else {
            return Ok(Some(stored.clone()));
        };

        match cipher.decrypt(stored) {
            Ok(secret) => Ok(Some(secret)),
            Err(err) => {
                tracing::warn!(
                    provider = id,
                    error = %err,
                    "stored credential could not be decrypted; treating it as legacy plaintext"
                );
                Ok(Some(stored.clone()))
            }
        }
    }

    /// Remove the secret stored under `id`; returns whether one existed.
    pub fn delete(&self, id: &str) -> Result<bool, CredentialError> {
        let mut secrets = self.load_map()?;
        if secrets.remove(id).is_none() {
            return Ok(false);
        }
        self.save_map(&secrets)?;
        Ok(true)
    }

    pub fn contains(&self, id: &str) -> Result<bool, CredentialError> {
        Ok(self.load_map()?.contains_key(id))
    }

    /// Provider ids with a stored secret, sorted
    pub fn ids(&self) -> Result<Vec<String>, CredentialError> {
        Ok(self.load_map()?.into_keys().collect())
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        if !self.secrets_path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.secrets_path).map_err(|source| CredentialError::Io {
            path: self.secrets_path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| CredentialError::Serialization {
            path: self.secrets_path.clone(),
            source,
        })
    }

    fn save_map(&self, secrets: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let serialized =
            serde_json::to_vec_pretty(secrets).map_err(|source| CredentialError::Serialization {
                path: self.secrets_path.clone(),
                source,
            })?;
        write_private_file(&self.secrets_path, &serialized).map_err(|source| {
            CredentialError::Io {
                path: self.secrets_path.clone(),
                source,
            }
        })
    }
}
