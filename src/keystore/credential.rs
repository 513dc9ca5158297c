//! Keyrings on external secret stores
//!
//! The `os` backend keeps entries in the platform credential store (macOS
//! Keychain, Windows Credential Manager, Secret Service) through the
//! `keyring` crate. The `pass` backend keeps them in the `pass` password
//! manager.
//!
//! Every key is an entry `<name>` holding its key file as JSON, next to an
//! entry `<address-hex>.address` holding the name. Neither store can be
//! enumerated, so the key names are also kept in a `.index` entry.

use crate::crypto::{compressed_public_key, AccountAddress, KeyAlgorithm};
use crate::keystore::encrypted::{validate_name, KeyFile};
use crate::keystore::{KeyRecord, Keyring, KeyringError, KeyringResult, Protection};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Entry listing every key name
const INDEX_ACCOUNT: &str = ".index";

/// A flat store of secrets addressed by account name
pub trait SecretStore {
    /// The secret of `account`, or `None` if there is no such entry
    fn get(&self, account: &str) -> KeyringResult<Option<String>>;

    /// Create or replace the secret of `account`
    fn set(&mut self, account: &str, secret: &str) -> KeyringResult<()>;
}

/// Platform credential store, entries grouped under a service name
pub struct OsStore {
    service: String,
}

impl OsStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> KeyringResult<keyring::Entry> {
        keyring::Entry::new(&self.service, account).map_err(credential_error)
    }
}

fn credential_error(err: keyring::Error) -> KeyringError {
    KeyringError::Storage(format!("Credential store error: {}", err))
}

impl SecretStore for OsStore {
    fn get(&self, account: &str) -> KeyringResult<Option<String>> {
        match self.entry(account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(credential_error(e)),
        }
    }

    fn set(&mut self, account: &str, secret: &str) -> KeyringResult<()> {
        self.entry(account)?
            .set_password(secret)
            .map_err(credential_error)
    }
}

/// The `pass` password manager, entries stored under `<prefix>/`
pub struct PassStore {
    program: PathBuf,
    leading_args: Vec<String>,
    prefix: String,
}

impl PassStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("pass"),
            leading_args: Vec::new(),
            prefix: prefix.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args);
        command
    }

    fn entry_path(&self, account: &str) -> String {
        format!("{}/{}", self.prefix, account)
    }
}

impl SecretStore for PassStore {
    fn get(&self, account: &str) -> KeyringResult<Option<String>> {
        let output = self
            .command()
            .arg("show")
            .arg(self.entry_path(account))
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("is not in the password store") {
                return Ok(None);
            }
            return Err(KeyringError::Storage(format!(
                "pass show failed: {}",
                stderr.trim()
            )));
        }

        let secret = String::from_utf8(output.stdout)
            .map_err(|e| KeyringError::Storage(format!("pass entry is not UTF-8: {}", e)))?;
        Ok(Some(secret.trim_end_matches('\n').to_string()))
    }

    fn set(&mut self, account: &str, secret: &str) -> KeyringResult<()> {
        let mut child = self
            .command()
            .args(["insert", "--multiline", "--force"])
            .arg(self.entry_path(account))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(secret.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(KeyringError::Storage(format!(
                "pass insert failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Keyring over a [`SecretStore`]
pub struct CredentialKeyring<S: SecretStore> {
    store: S,
}

impl<S: SecretStore> CredentialKeyring<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn address_account(address: &AccountAddress) -> String {
        format!("{}.address", address.to_hex())
    }

    fn names(&self) -> KeyringResult<Vec<String>> {
        match self.store.get(INDEX_ACCOUNT)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn load(&self, name: &str) -> KeyringResult<KeyFile> {
        let json = self.store.get(name)?.ok_or_else(|| {
            KeyringError::Storage(format!("Keyring index points to missing key {}", name))
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl<S: SecretStore> Keyring for CredentialKeyring<S> {
    fn key_by_address(&self, address: &AccountAddress) -> KeyringResult<KeyRecord> {
        let name = self
            .store
            .get(&Self::address_account(address))?
            .ok_or_else(|| KeyringError::NotFound(address.to_hex()))?;
        self.load(name.trim())?.record()
    }

    fn import_raw_key(
        &mut self,
        name: &str,
        private_key: &[u8],
        algorithm: KeyAlgorithm,
    ) -> KeyringResult<KeyRecord> {
        validate_name(name)?;
        if self.store.get(name)?.is_some() {
            return Err(KeyringError::AlreadyExists(name.to_string()));
        }

        let public_key = compressed_public_key(private_key)
            .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
        let address = AccountAddress::from_public_key(&public_key);
        let address_account = Self::address_account(&address);
        if let Some(existing) = self.store.get(&address_account)? {
            return Err(KeyringError::AlreadyExists(existing.trim().to_string()));
        }

        let record = KeyRecord {
            name: name.to_string(),
            algorithm,
            public_key: public_key.to_vec(),
            address,
        };

        // the store itself protects the entry
        let file = KeyFile::seal(&record, private_key, &Protection::Plaintext)?;
        self.store.set(name, &serde_json::to_string(&file)?)?;
        self.store.set(&address_account, name)?;

        let mut names = self.names()?;
        names.push(name.to_string());
        self.store.set(INDEX_ACCOUNT, &serde_json::to_string(&names)?)?;

        debug!(name, address = %address, "Stored key in credential store");
        Ok(record)
    }

    fn list(&self) -> KeyringResult<Vec<KeyRecord>> {
        self.names()?
            .iter()
            .map(|name| self.load(name)?.record())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(HashMap<String, String>);

    impl SecretStore for MapStore {
        fn get(&self, account: &str) -> KeyringResult<Option<String>> {
            Ok(self.0.get(account).cloned())
        }

        fn set(&mut self, account: &str, secret: &str) -> KeyringResult<()> {
            self.0.insert(account.to_string(), secret.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_import_and_lookup() {
        let mut keyring = CredentialKeyring::new(MapStore::default());
        let record = keyring
            .import_raw_key("key1", &[1u8; 32], KeyAlgorithm::Secp256k1)
            .unwrap();

        assert_eq!(
            record.address.to_hex(),
            "79b000887626b294a914501a4cd226b58b235983"
        );
        assert_eq!(keyring.key_by_address(&record.address).unwrap(), record);
        assert_eq!(keyring.list().unwrap(), vec![record]);

        let entries = &keyring.store.0;
        assert!(entries.contains_key("key1"));
        assert_eq!(
            entries["79b000887626b294a914501a4cd226b58b235983.address"],
            "key1"
        );
    }

    #[test]
    fn test_lookup_missing_is_not_found() {
        let keyring = CredentialKeyring::new(MapStore::default());
        let address = AccountAddress::from_public_key(&[2u8; 33]);

        assert!(matches!(
            keyring.key_by_address(&address),
            Err(KeyringError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_address_reports_existing_name() {
        let mut keyring = CredentialKeyring::new(MapStore::default());
        keyring
            .import_raw_key("first", &[1u8; 32], KeyAlgorithm::Secp256k1)
            .unwrap();

        let result = keyring.import_raw_key("second", &[1u8; 32], KeyAlgorithm::Secp256k1);
        assert!(matches!(result, Err(KeyringError::AlreadyExists(n)) if n == "first"));
        assert_eq!(keyring.list().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_malformed_key() {
        let mut keyring = CredentialKeyring::new(MapStore::default());
        let result = keyring.import_raw_key("short", &[1u8; 16], KeyAlgorithm::Secp256k1);

        assert!(matches!(result, Err(KeyringError::InvalidKey(_))));
        assert!(keyring.list().unwrap().is_empty());
    }

    #[test]
    fn test_os_store_missing_entry() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());

        let store = OsStore::new("relay-keyloader-test");
        assert_eq!(store.get("absent").unwrap(), None);
    }

    /// Stand-in for `pass` keeping entries as plain files next to the script
    #[cfg(unix)]
    const FAKE_PASS: &str = r#"
store="$(dirname "$0")/store"
case "$1" in
  show)
    if [ -f "$store/$2" ]; then cat "$store/$2"; echo; else echo "Error: $2 is not in the password store." >&2; exit 1; fi ;;
  insert)
    shift
    while [ "${1#-}" != "$1" ]; do shift; done
    mkdir -p "$(dirname "$store/$1")"
    cat > "$store/$1" ;;
  *) exit 2 ;;
esac
"#;

    #[cfg(unix)]
    #[test]
    fn test_pass_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("pass.sh");
        std::fs::write(&script, FAKE_PASS).unwrap();

        let store = PassStore {
            program: PathBuf::from("sh"),
            leading_args: vec![script.to_string_lossy().into_owned()],
            prefix: "keyring-pocket".to_string(),
        };
        let mut keyring = CredentialKeyring::new(store);

        let address = AccountAddress::from_public_key(&compressed_public_key(&[1u8; 32]).unwrap());
        assert!(matches!(
            keyring.key_by_address(&address),
            Err(KeyringError::NotFound(_))
        ));

        let record = keyring
            .import_raw_key("key1", &[1u8; 32], KeyAlgorithm::Secp256k1)
            .unwrap();

        assert!(dir.path().join("store/keyring-pocket/key1").exists());
        assert_eq!(keyring.key_by_address(&address).unwrap(), record);
        assert_eq!(keyring.list().unwrap(), vec![record]);
    }
}
