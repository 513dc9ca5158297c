//! Account addresses
//!
//! An account address is `RIPEMD160(SHA256(compressed_pubkey))`. Its
//! human-readable form is bech32 under a prefix fixed when the
//! [`AddressCodec`] is built.

use crate::errors::{KeyLoaderError, Result};
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;

/// Raw 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress([u8; 20]);

impl AccountAddress {
    /// Hash a compressed public key into an account address
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Ripemd160::digest(Sha256::digest(public_key));
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| KeyLoaderError::InvalidKeyFormat(format!("Invalid address hex: {}", e)))?;
        let address: [u8; 20] = bytes.try_into().map_err(|_| {
            KeyLoaderError::InvalidKeyFormat("Address must be 20 bytes".to_string())
        })?;
        Ok(Self(address))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Bech32 encoder bound to one human-readable prefix
#[derive(Debug, Clone)]
pub struct AddressCodec {
    hrp: Hrp,
}

impl AddressCodec {
    pub fn new(prefix: &str) -> Result<Self> {
        let hrp = Hrp::parse(prefix).map_err(|e| {
            KeyLoaderError::ConfigError(format!("Invalid address prefix {:?}: {}", prefix, e))
        })?;
        Ok(Self { hrp })
    }

    pub fn prefix(&self) -> &str {
        self.hrp.as_str()
    }

    /// Canonical bech32 string for an account address
    pub fn encode(&self, address: &AccountAddress) -> Result<String> {
        bech32::encode::<Bech32>(self.hrp, address.as_bytes())
            .map_err(|e| KeyLoaderError::InvalidKeyFormat(e.to_string()))
    }
}
