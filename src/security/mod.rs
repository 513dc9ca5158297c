//! Secure handling of key material
//!
//! Private keys, seeds and passwords are held in buffers that are zeroed on
//! drop and never printed by `Debug`.

pub mod zeroize;

pub use zeroize::{SecureBytes, SecureString};
