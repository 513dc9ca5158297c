//! Keyring importer
//!
//! Computes the canonical name of a derived key and makes sure the key is
//! present in the keyring exactly once.

use crate::crypto::{AccountAddress, AddressCodec, DerivedKey};
use crate::errors::{KeyLoaderError, Result};
use crate::keystore::{Keyring, KeyringError};
use tracing::{debug, info, warn};

/// Outcome of importing one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedKey {
    /// Name the key is stored under in the keyring
    pub name: String,
    /// Canonical bech32 address of the key
    pub address: String,
    /// False when the keyring already held the key
    pub newly_imported: bool,
}

/// Imports derived keys under their address-derived names
pub struct KeyringImporter<'a, K: Keyring + ?Sized> {
    keyring: &'a mut K,
    codec: &'a AddressCodec,
}

impl<'a, K: Keyring + ?Sized> KeyringImporter<'a, K> {
    pub fn new(keyring: &'a mut K, codec: &'a AddressCodec) -> Self {
        Self { keyring, codec }
    }

    /// Import `key` unless its address is already present.
    ///
    /// An entry found under a different name is returned as is; it is never
    /// renamed or duplicated.
    pub fn import_key(&mut self, key: &DerivedKey) -> Result<ImportedKey> {
        let public_key = key.public_key().map_err(|e| {
            KeyLoaderError::KeyringImportFailure {
                name: "<invalid key>".to_string(),
                source: KeyringError::InvalidKey(e.to_string()),
            }
        })?;
        let account = AccountAddress::from_public_key(&public_key);
        let name = self.codec.encode(&account)?;

        debug!(address = %name, "Attempting to import private key");

        match self.keyring.key_by_address(&account) {
            Ok(existing) => {
                if existing.name != name {
                    warn!(
                        existing_name = %existing.name,
                        calculated_name = %name,
                        "Key already exists with a different name"
                    );
                } else {
                    debug!(name = %name, "Key already exists in keyring");
                }
                return Ok(ImportedKey {
                    name: existing.name,
                    address: name,
                    newly_imported: false,
                });
            }
            Err(KeyringError::NotFound(_)) => {
                debug!(name = %name, "Key not found in keyring, importing");
            }
            Err(source) => {
                return Err(KeyLoaderError::KeyringLookupFailure {
                    address: name,
                    source,
                });
            }
        }

        self.keyring
            .import_raw_key(&name, key.secret_bytes(), key.algorithm())
            .map_err(|source| KeyLoaderError::KeyringImportFailure {
                name: name.clone(),
                source,
            })?;

        info!(name = %name, "Successfully imported key");
        Ok(ImportedKey {
            address: name.clone(),
            name,
            newly_imported: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_from_hex, KeyAlgorithm};
    use crate::keystore::{KeyRecord, KeyringResult, MemoryKeyring};

    const KEY_HEX: &str = "c4a48e2fce1481cd3294b4490f6678090ea98d3d0e5cd984558ab0968741b104";
    const KEY_NAME: &str = "pokt19rl4cm2hmr8afy4kldpxz3fka4jguq0apxjfrd";

    fn codec() -> AddressCodec {
        AddressCodec::new("pokt").unwrap()
    }

    #[test]
    fn test_imports_under_canonical_name() {
        let codec = codec();
        let mut keyring = MemoryKeyring::new();
        let key = derive_from_hex(KEY_HEX).unwrap();

        let imported = KeyringImporter::new(&mut keyring, &codec)
            .import_key(&key)
            .unwrap();

        assert_eq!(imported.name, KEY_NAME);
        assert_eq!(imported.address, KEY_NAME);
        assert!(imported.newly_imported);
        assert_eq!(keyring.list().unwrap()[0].name, KEY_NAME);
    }

    #[test]
    fn test_second_import_is_noop() {
        let codec = codec();
        let mut keyring = MemoryKeyring::new();
        let key = derive_from_hex(KEY_HEX).unwrap();

        let mut importer = KeyringImporter::new(&mut keyring, &codec);
        let first = importer.import_key(&key).unwrap();
        let second = importer.import_key(&key).unwrap();

        assert_eq!(first.name, second.name);
        assert!(!second.newly_imported);
        assert_eq!(keyring.list().unwrap().len(), 1);
    }

    #[test]
    fn test_keeps_custom_name() {
        let codec = codec();
        let mut keyring = MemoryKeyring::new();
        let key = derive_from_hex(KEY_HEX).unwrap();
        keyring
            .import_raw_key("operator-key", key.secret_bytes(), KeyAlgorithm::Secp256k1)
            .unwrap();

        let imported = KeyringImporter::new(&mut keyring, &codec)
            .import_key(&key)
            .unwrap();

        assert_eq!(imported.name, "operator-key");
        assert_eq!(imported.address, KEY_NAME);
        assert!(!imported.newly_imported);
        let names: Vec<_> = keyring.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["operator-key".to_string()]);
    }

    #[test]
    fn test_malformed_key_fails_at_import() {
        let codec = codec();
        let mut keyring = MemoryKeyring::new();
        let key = derive_from_hex("0xabcd").unwrap();

        let result = KeyringImporter::new(&mut keyring, &codec).import_key(&key);
        assert!(matches!(
            result,
            Err(KeyLoaderError::KeyringImportFailure {
                source: KeyringError::InvalidKey(_),
                ..
            })
        ));
    }

    /// Keyring whose lookups always fail with a backend error
    struct BrokenKeyring;

    impl Keyring for BrokenKeyring {
        fn key_by_address(&self, _address: &AccountAddress) -> KeyringResult<KeyRecord> {
            Err(KeyringError::Storage("disk on fire".to_string()))
        }

        fn import_raw_key(
            &mut self,
            _name: &str,
            _private_key: &[u8],
            _algorithm: KeyAlgorithm,
        ) -> KeyringResult<KeyRecord> {
            panic!("import must not be attempted after a failed lookup");
        }

        fn list(&self) -> KeyringResult<Vec<KeyRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_lookup_error_is_propagated() {
        let codec = codec();
        let mut keyring = BrokenKeyring;
        let key = derive_from_hex(KEY_HEX).unwrap();

        let result = KeyringImporter::new(&mut keyring, &codec).import_key(&key);
        assert!(matches!(
            result,
            Err(KeyLoaderError::KeyringLookupFailure { address, .. }) if address == KEY_NAME
        ));
    }
}
