//! Zeroizing containers for key material and passwords
//!
//! Private keys, seeds and keyring passwords only ever live in these
//! wrappers. The `zeroize` crate guarantees the wipe on drop is not
//! optimized away.

use std::fmt;
use zeroize::ZeroizeOnDrop;

/// Sensitive bytes that are wiped on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureBytes {
    inner: Vec<u8>,
}

impl SecureBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self { inner: data }
    }

    pub fn expose(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED; {}])", self.inner.len())
    }
}

/// A string that is wiped on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub fn new(s: String) -> Self {
        Self { inner: s }
    }

    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_bytes_expose() {
        let secure = SecureBytes::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(secure.expose(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let bytes = SecureBytes::from(&[0xde, 0xad, 0xbe, 0xef][..]);
        assert_eq!(format!("{:?}", bytes), "SecureBytes([REDACTED; 4])");

        let password = SecureString::from("hunter2");
        assert!(!format!("{:?}", password).contains("hunter2"));
        assert_eq!(password.expose(), "hunter2");
    }
}
