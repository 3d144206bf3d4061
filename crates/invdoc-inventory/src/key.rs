//! Client key loading.

use std::path::Path;

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

use crate::error::{InventoryError, RsaKeyError};

/// Load the client key from a PEM file.
///
/// # Errors
///
/// Returns [`InventoryError::Io`] if the file cannot be read and
/// [`InventoryError::RsaKey`] if it holds no usable key.
pub fn load_private_key_from_file(path: &Path) -> Result<RsaPrivateKey, InventoryError> {
    let data = std::fs::read(path)?;
    Ok(load_private_key(&data)?)
}

/// Parse a PEM key, `RSA PRIVATE KEY` (PKCS#1, what Chef hands out) first
/// and `PRIVATE KEY` (PKCS#8) second.
///
/// # Errors
///
/// Returns the PKCS#8 error when neither format parses.
pub fn load_private_key(pem: &[u8]) -> Result<RsaPrivateKey, RsaKeyError> {
    let pem = std::str::from_utf8(pem)?;

    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }

    Ok(RsaPrivateKey::from_pkcs8_pem(pem)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKCS1: &str = include_str!("../testdata/client-pkcs1.pem");
    const PKCS8: &str = include_str!("../testdata/client-pkcs8.pem");

    #[test]
    fn test_pkcs1() {
        assert!(load_private_key(PKCS1.as_bytes()).is_ok());
    }

    #[test]
    fn test_pkcs8() {
        assert!(load_private_key(PKCS8.as_bytes()).is_ok());
    }

    #[test]
    fn test_garbage() {
        let err = load_private_key(b"not a key").unwrap_err();
        assert!(matches!(err, RsaKeyError::Pkcs8(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = load_private_key(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, RsaKeyError::InvalidUtf8(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.pem");
        std::fs::write(&path, PKCS1).unwrap();

        assert!(load_private_key_from_file(&path).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = load_private_key_from_file(Path::new("/nonexistent/client.pem")).unwrap_err();
        assert!(matches!(err, InventoryError::Io(_)));
    }
}
