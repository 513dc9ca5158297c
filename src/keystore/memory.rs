//! In-memory keyring
//!
//! Holds key metadata for the lifetime of the process only, private keys
//! are checked and then dropped. Used for dry runs and in tests.

use crate::crypto::{compressed_public_key, AccountAddress, KeyAlgorithm};
use crate::keystore::{KeyRecord, Keyring, KeyringError, KeyringResult};
use std::collections::HashMap;
use tracing::debug;

/// Ephemeral keyring
#[derive(Default)]
pub struct MemoryKeyring {
    /// Map of name -> record
    keys: HashMap<String, KeyRecord>,
    /// Map of address -> name
    by_address: HashMap<AccountAddress, String>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keyring for MemoryKeyring {
    fn key_by_address(&self, address: &AccountAddress) -> KeyringResult<KeyRecord> {
        self.by_address
            .get(address)
            .and_then(|name| self.keys.get(name))
            .cloned()
            .ok_or_else(|| KeyringError::NotFound(address.to_hex()))
    }

    fn import_raw_key(
        &mut self,
        name: &str,
        private_key: &[u8],
        algorithm: KeyAlgorithm,
    ) -> KeyringResult<KeyRecord> {
        if name.is_empty() {
            return Err(KeyringError::InvalidName(name.to_string()));
        }
        if self.keys.contains_key(name) {
            return Err(KeyringError::AlreadyExists(name.to_string()));
        }

        let public_key = compressed_public_key(private_key)
            .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
        let address = AccountAddress::from_public_key(&public_key);
        if let Some(existing) = self.by_address.get(&address) {
            return Err(KeyringError::AlreadyExists(existing.clone()));
        }

        let record = KeyRecord {
            name: name.to_string(),
            algorithm,
            public_key: public_key.to_vec(),
            address,
        };

        self.keys.insert(name.to_string(), record.clone());
        self.by_address.insert(address, name.to_string());

        debug!(name, address = %address, "Stored key in memory keyring");
        Ok(record)
    }

    fn list(&self) -> KeyringResult<Vec<KeyRecord>> {
        Ok(self.keys.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_and_lookup() {
        let mut keyring = MemoryKeyring::new();
        let record = keyring
            .import_raw_key("key1", &[1u8; 32], KeyAlgorithm::Secp256k1)
            .unwrap();

        assert_eq!(record.public_key.len(), 33);
        assert_eq!(
            record.address.to_hex(),
            "79b000887626b294a914501a4cd226b58b235983"
        );

        let found = keyring.key_by_address(&record.address).unwrap();
        assert_eq!(found, record);
        assert_eq!(keyring.list().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_missing_is_not_found() {
        let keyring = MemoryKeyring::new();
        let address = AccountAddress::from_public_key(&[2u8; 33]);

        let result = keyring.key_by_address(&address);
        assert!(matches!(result, Err(KeyringError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_name_or_address() {
        let mut keyring = MemoryKeyring::new();
        keyring
            .import_raw_key("key1", &[1u8; 32], KeyAlgorithm::Secp256k1)
            .unwrap();

        let same_name = keyring.import_raw_key("key1", &[2u8; 32], KeyAlgorithm::Secp256k1);
        assert!(matches!(same_name, Err(KeyringError::AlreadyExists(_))));

        let same_key = keyring.import_raw_key("other", &[1u8; 32], KeyAlgorithm::Secp256k1);
        assert!(matches!(same_key, Err(KeyringError::AlreadyExists(n)) if n == "key1"));
    }

    #[test]
    fn test_rejects_malformed_key() {
        let mut keyring = MemoryKeyring::new();
        let result = keyring.import_raw_key("short", &[1u8; 16], KeyAlgorithm::Secp256k1);

        assert!(matches!(result, Err(KeyringError::InvalidKey(_))));
        assert!(keyring.list().unwrap().is_empty());
    }
}
