//! Key derivation from mnemonics and hex strings
//!
//! Seeds follow BIP-39 with an empty passphrase and keys are derived along
//! the Cosmos path `m/44'/118'/0'/0/{index}`.

use crate::crypto::keys::DerivedKey;
use crate::security::SecureBytes;
use bip39::{Language, Mnemonic};
use coins_bip32::path::DerivationPath;
use coins_bip32::prelude::*;
use k256::ecdsa::SigningKey;

/// SLIP-44 coin type used by Cosmos SDK chains
pub const COSMOS_COIN_TYPE: u32 = 118;

/// Full HD path for an address index on account 0, external chain
pub fn hd_path(index: u32) -> String {
    format!("m/44'/{}'/0'/0/{}", COSMOS_COIN_TYPE, index)
}

/// A validated mnemonic, reduced to its BIP-39 seed
pub struct HdSeed {
    seed: SecureBytes,
}

impl HdSeed {
    /// Validate the phrase against the English wordlist and its checksum,
    /// then compute the seed.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, bip39::Error> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)?;
        let seed = mnemonic.to_seed("");
        Ok(Self {
            seed: SecureBytes::new(seed.to_vec()),
        })
    }

    /// Derive the private key at `index`
    pub fn derive(&self, index: u32) -> Result<DerivedKey, Bip32Error> {
        let path = hd_path(index).parse::<DerivationPath>()?;

        let master_key = XPriv::root_from_seed(self.seed.expose(), None)?;
        let derived_key = master_key.derive_path(&path)?;

        let signing_key: &SigningKey = derived_key.as_ref();
        Ok(DerivedKey::secp256k1(signing_key.to_bytes().to_vec()))
    }
}

/// Decode a hex private key, with or without a `0x` prefix
pub fn derive_from_hex(encoded: &str) -> Result<DerivedKey, hex::FromHexError> {
    let encoded = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = hex::decode(encoded)?;
    Ok(DerivedKey::secp256k1(bytes))
}
