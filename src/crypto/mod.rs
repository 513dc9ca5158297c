//! Key derivation and address encoding

pub mod address;
pub mod hd;
pub mod keys;

pub use address::{AccountAddress, AddressCodec};
pub use hd::{derive_from_hex, HdSeed};
pub use keys::{compressed_public_key, DerivedKey, KeyAlgorithm};
