//! On-disk keyring
//!
//! Every key is a `<name>.json` file in the keyring directory, next to an
//! `<address-hex>.address` file that holds the name and serves as the
//! address index. With [`Protection::Password`] the private key is sealed
//! with AES-256-GCM under an Argon2id-derived key. With
//! [`Protection::Plaintext`] it is only base64-encoded.

use crate::crypto::{compressed_public_key, AccountAddress, KeyAlgorithm};
use crate::keystore::{KeyRecord, Keyring, KeyringError, KeyringResult};
use crate::security::{SecureBytes, SecureString};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Salt size for Argon2
const SALT_SIZE: usize = 16;

/// Nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

/// Current key file format
const KEY_FILE_VERSION: u32 = 1;

/// How private keys are protected at rest
#[derive(Debug, Clone)]
pub enum Protection {
    Plaintext,
    Password(SecureString),
}

/// Key file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Version of the file format
    pub version: u32,

    /// Key name
    pub name: String,

    /// Signing algorithm ("secp256k1")
    pub algorithm: String,

    /// Account address (hex)
    pub address: String,

    /// Compressed public key (hex)
    pub public_key: String,

    /// Salt for key derivation (base64), absent for plaintext keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Nonce for AES-GCM (base64), absent for plaintext keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Private key, encrypted or not (base64)
    pub payload: String,

    /// Creation timestamp
    pub created_at: i64,
}

impl KeyFile {
    /// Build a key file for `record`, protecting `private_key` as requested
    pub fn seal(
        record: &KeyRecord,
        private_key: &[u8],
        protection: &Protection,
    ) -> KeyringResult<Self> {
        let (salt, nonce, payload) = match protection {
            Protection::Plaintext => (None, None, STANDARD.encode(private_key)),
            Protection::Password(password) => {
                let mut salt_bytes = [0u8; SALT_SIZE];
                rand::thread_rng().fill_bytes(&mut salt_bytes);
                let encryption_key = derive_key(password.expose(), &salt_bytes)?;

                let mut nonce_bytes = [0u8; NONCE_SIZE];
                rand::thread_rng().fill_bytes(&mut nonce_bytes);

                let cipher = Aes256Gcm::new_from_slice(encryption_key.expose())
                    .map_err(|e| KeyringError::Crypto(e.to_string()))?;
                let ciphertext = cipher
                    .encrypt(Nonce::from_slice(&nonce_bytes), private_key)
                    .map_err(|e| KeyringError::Crypto(e.to_string()))?;

                (
                    Some(STANDARD.encode(salt_bytes)),
                    Some(STANDARD.encode(nonce_bytes)),
                    STANDARD.encode(ciphertext),
                )
            }
        };

        Ok(Self {
            version: KEY_FILE_VERSION,
            name: record.name.clone(),
            algorithm: record.algorithm.as_str().to_string(),
            address: record.address.to_hex(),
            public_key: hex::encode(&record.public_key),
            salt,
            nonce,
            payload,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Recover the private key
    pub fn unseal(&self, protection: &Protection) -> KeyringResult<SecureBytes> {
        let payload = decode_base64(&self.payload, "payload")?;

        let (salt, nonce) = match (&self.salt, &self.nonce) {
            (None, None) => return Ok(SecureBytes::new(payload)),
            (Some(salt), Some(nonce)) => (salt, nonce),
            _ => {
                return Err(KeyringError::Storage(format!(
                    "Key file {} has incomplete encryption parameters",
                    self.name
                )))
            }
        };

        let Protection::Password(password) = protection else {
            return Err(KeyringError::Crypto(format!(
                "Key {} is encrypted but the keyring has no password",
                self.name
            )));
        };

        let salt_bytes = decode_base64(salt, "salt")?;
        let nonce_bytes = decode_base64(nonce, "nonce")?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(KeyringError::Storage("Invalid nonce length".to_string()));
        }

        let decryption_key = derive_key(password.expose(), &salt_bytes)?;
        let cipher = Aes256Gcm::new_from_slice(decryption_key.expose())
            .map_err(|e| KeyringError::Crypto(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), payload.as_slice())
            .map_err(|_| KeyringError::WrongPassword)?;

        Ok(SecureBytes::new(plaintext))
    }

    /// Public metadata of this key
    pub fn record(&self) -> KeyringResult<KeyRecord> {
        let algorithm = KeyAlgorithm::from_str(&self.algorithm)
            .map_err(|e| KeyringError::Storage(e.to_string()))?;
        let address = AccountAddress::from_hex(&self.address)
            .map_err(|e| KeyringError::Storage(e.to_string()))?;
        let public_key = hex::decode(&self.public_key)
            .map_err(|e| KeyringError::Storage(format!("Invalid public key: {}", e)))?;

        Ok(KeyRecord {
            name: self.name.clone(),
            algorithm,
            public_key,
            address,
        })
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> KeyringResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from a file
    pub fn load(path: &Path) -> KeyringResult<Self> {
        let json = fs::read_to_string(path)?;
        let file: Self = serde_json::from_str(&json)?;
        Ok(file)
    }
}

fn decode_base64(value: &str, field: &str) -> KeyringResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| KeyringError::Storage(format!("Invalid {}: {}", field, e)))
}

/// Derive an encryption key from a password using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> KeyringResult<SecureBytes> {
    use argon2::{Algorithm, Params, Version};

    let params = Params::new(
        65536, // 64 MB memory
        3,     // 3 iterations
        4,     // 4 parallel lanes
        Some(32),
    )
    .map_err(|e| KeyringError::Crypto(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = vec![0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|e| KeyringError::Crypto(e.to_string()))?;

    Ok(SecureBytes::new(output))
}

/// Keyring backed by a directory of key files
pub struct FileKeyring {
    dir: PathBuf,
    protection: Protection,
}

impl FileKeyring {
    /// Open (creating if needed) the keyring in `dir`.
    ///
    /// For password-protected keyrings the password is checked against an
    /// existing entry, so a wrong password fails here instead of silently
    /// adding keys sealed under a second password.
    pub fn open(dir: impl AsRef<Path>, protection: Protection) -> KeyringResult<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let keyring = Self { dir, protection };
        keyring.verify_password()?;
        Ok(keyring)
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn address_path(&self, address: &AccountAddress) -> PathBuf {
        self.dir.join(format!("{}.address", address.to_hex()))
    }

    fn key_files(&self) -> KeyringResult<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn verify_password(&self) -> KeyringResult<()> {
        if let Protection::Password(_) = self.protection {
            if let Some(path) = self.key_files()?.first() {
                KeyFile::load(path)?.unseal(&self.protection)?;
                debug!(dir = %self.dir.display(), "Keyring password verified");
            }
        }
        Ok(())
    }

    fn load(&self, name: &str) -> KeyringResult<KeyFile> {
        let path = self.key_path(name);
        if !path.exists() {
            return Err(KeyringError::NotFound(name.to_string()));
        }
        KeyFile::load(&path)
    }
}

pub(crate) fn validate_name(name: &str) -> KeyringResult<()> {
    let bad_char = name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control());
    if name.is_empty() || bad_char || name.starts_with('.') {
        return Err(KeyringError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl Keyring for FileKeyring {
    fn key_by_address(&self, address: &AccountAddress) -> KeyringResult<KeyRecord> {
        let name = match fs::read_to_string(self.address_path(address)) {
            Ok(name) => name.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(KeyringError::NotFound(address.to_hex()))
            }
            Err(e) => return Err(e.into()),
        };

        let file = self.load(&name).map_err(|e| match e {
            KeyringError::NotFound(_) => {
                KeyringError::Storage(format!("Address index points to missing key {}", name))
            }
            other => other,
        })?;
        file.record()
    }

    fn import_raw_key(
        &mut self,
        name: &str,
        private_key: &[u8],
        algorithm: KeyAlgorithm,
    ) -> KeyringResult<KeyRecord> {
        validate_name(name)?;

        let key_path = self.key_path(name);
        if key_path.exists() {
            return Err(KeyringError::AlreadyExists(name.to_string()));
        }

        let public_key = compressed_public_key(private_key)
            .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
        let address = AccountAddress::from_public_key(&public_key);

        let address_path = self.address_path(&address);
        if address_path.exists() {
            let existing = fs::read_to_string(&address_path)?;
            return Err(KeyringError::AlreadyExists(existing.trim().to_string()));
        }

        let record = KeyRecord {
            name: name.to_string(),
            algorithm,
            public_key: public_key.to_vec(),
            address,
        };

        KeyFile::seal(&record, private_key, &self.protection)?.save(&key_path)?;
        fs::write(&address_path, name)?;

        debug!(name, address = %address, path = %key_path.display(), "Wrote key file");
        Ok(record)
    }

    fn list(&self) -> KeyringResult<Vec<KeyRecord>> {
        self.key_files()?
            .iter()
            .map(|path| KeyFile::load(path)?.record())
            .collect()
    }
}
