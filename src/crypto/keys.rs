//! secp256k1 key material
//!
//! A [`DerivedKey`] is the raw private scalar produced by the deriver and
//! consumed once by the keyring importer.

use crate::errors::{KeyLoaderError, Result};
use crate::security::SecureBytes;
use k256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey};

/// Length of a secp256k1 private key in bytes
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a compressed SEC1 public key in bytes
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Signing algorithm of a keyring entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Secp256k1,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Secp256k1 => "secp256k1",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "secp256k1" => Ok(KeyAlgorithm::Secp256k1),
            _ => Err(KeyLoaderError::InvalidKeyFormat(format!(
                "Unsupported key algorithm: {}",
                s
            ))),
        }
    }
}

/// Private key bytes plus their curve
#[derive(Debug, Clone)]
pub struct DerivedKey {
    secret: SecureBytes,
    algorithm: KeyAlgorithm,
}

impl DerivedKey {
    /// Wrap raw secp256k1 private key bytes. The length is not checked here.
    pub fn secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            secret: SecureBytes::new(bytes),
            algorithm: KeyAlgorithm::Secp256k1,
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.expose()
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Compressed public key for this private key
    pub fn public_key(&self) -> Result<[u8; COMPRESSED_PUBLIC_KEY_LEN]> {
        compressed_public_key(self.secret.expose())
    }
}

/// Compute the compressed SEC1 public key of a raw secp256k1 private key
pub fn compressed_public_key(private_key: &[u8]) -> Result<[u8; COMPRESSED_PUBLIC_KEY_LEN]> {
    if private_key.len() != PRIVATE_KEY_LEN {
        return Err(KeyLoaderError::InvalidKeyFormat(format!(
            "Expected {} bytes, got {}",
            PRIVATE_KEY_LEN,
            private_key.len()
        )));
    }

    let secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| KeyLoaderError::InvalidKeyFormat(e.to_string()))?;

    let point = secret_key.public_key().to_encoded_point(true);
    let mut public_key = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
    public_key.copy_from_slice(point.as_bytes());
    Ok(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_public_key() {
        let private_key =
            hex::decode("c4a48e2fce1481cd3294b4490f6678090ea98d3d0e5cd984558ab0968741b104")
                .unwrap();

        let public_key = compressed_public_key(&private_key).unwrap();
        assert_eq!(
            hex::encode(public_key),
            "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62"
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        let result = compressed_public_key(&[1u8; 31]);
        assert!(matches!(result, Err(KeyLoaderError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_rejects_zero_scalar() {
        let result = compressed_public_key(&[0u8; 32]);
        assert!(matches!(result, Err(KeyLoaderError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(KeyAlgorithm::Secp256k1.as_str(), "secp256k1");
        assert_eq!(
            KeyAlgorithm::from_str("SECP256K1").unwrap(),
            KeyAlgorithm::Secp256k1
        );
        assert!(KeyAlgorithm::from_str("ed25519").is_err());
    }
}
