//! Error types for inventory access.

use std::str::Utf8Error;

/// Error raised while talking to an inventory.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// Server answered with an error status.
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// The node does not exist.
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// The node name cannot be used in a request path.
    #[error("invalid node name '{0}'")]
    InvalidNodeName(String),

    /// Server URL cannot be parsed.
    #[error("invalid inventory URL '{url}': {message}")]
    InvalidUrl {
        /// The URL as configured.
        url: String,
        /// Parser message.
        message: String,
    },

    /// Client key loading error.
    #[error("RSA key error: {0}")]
    RsaKey(#[from] RsaKeyError),

    /// Request signing failed.
    #[error("request signing failed: {0}")]
    Sign(#[from] rsa::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// RSA key loading/parsing error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsaKeyError {
    /// Invalid UTF-8 in key file.
    #[error("invalid UTF-8 in key: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    /// PKCS#1 key parsing error.
    #[error("PKCS#1 key error: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// PKCS#8 key parsing error (returned when both formats fail).
    #[error("PKCS#8 key error: {0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),
}
