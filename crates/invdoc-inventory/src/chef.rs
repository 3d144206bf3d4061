//! Chef server adapter.
//!
//! Requests are signed with the Chef v1.0 header protocol: a canonical
//! request string is signed with the client key (PKCS#1 v1.5, no digest
//! prefix) and the base64 signature is split across `X-Ops-Authorization-N`
//! headers.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use ureq::Agent;
use ureq::http::Uri;

use crate::error::InventoryError;
use crate::key::load_private_key_from_file;
use crate::snapshot::NodeSnapshot;
use crate::{Inventory, InventorySession};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Chef API version sent with every request.
const CHEF_VERSION: &str = "11.0.0";

/// Length of one `X-Ops-Authorization-N` header value.
const AUTH_CHUNK: usize = 60;

/// Chef server reachable over HTTP.
///
/// Every [`open`](Inventory::open) creates a new HTTP agent, so connections
/// are never reused across sessions.
pub struct ChefServer {
    base_url: String,
    login: String,
    private_key: RsaPrivateKey,
    timeout: Duration,
}

impl std::fmt::Debug for ChefServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChefServer")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl ChefServer {
    /// Create an adapter with an already loaded client key.
    #[must_use]
    pub fn new(base_url: &str, login: &str, private_key: RsaPrivateKey) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            login: login.to_owned(),
            private_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }

    /// Create an adapter from config values.
    ///
    /// # Arguments
    /// * `base_url` - Server URL, including `/organizations/<org>` if needed
    /// * `key_file` - Client key (PEM)
    /// * `login` - Client name the key belongs to
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be read or parsed.
    pub fn from_config(base_url: &str, key_file: &Path, login: &str) -> Result<Self, InventoryError> {
        let private_key = load_private_key_from_file(key_file)?;
        Ok(Self::new(base_url, login, private_key))
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn node_url(&self, name: &str) -> Result<(String, Uri), InventoryError> {
        if !is_valid_node_name(name) {
            return Err(InventoryError::InvalidNodeName(name.to_owned()));
        }
        let url = format!("{}/nodes/{name}", self.base_url);
        let uri = url.parse::<Uri>().map_err(|e| InventoryError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok((url, uri))
    }
}

impl Inventory for ChefServer {
    fn open(&self) -> Result<Box<dyn InventorySession + '_>, InventoryError> {
        let agent = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        tracing::debug!(url = %self.base_url, login = %self.login, "Opened inventory session");
        Ok(Box::new(ChefSession {
            server: self,
            agent,
        }))
    }
}

struct ChefSession<'a> {
    server: &'a ChefServer,
    agent: Agent,
}

impl InventorySession for ChefSession<'_> {
    fn node(&mut self, name: &str) -> Result<NodeSnapshot, InventoryError> {
        let (url, uri) = self.server.node_url(name)?;
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let headers = sign_request(
            "GET",
            uri.path(),
            b"",
            &self.server.login,
            &timestamp,
            &self.server.private_key,
        )?;

        tracing::debug!(node = name, %url, "Fetching node");

        let mut request = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Chef-Version", CHEF_VERSION);
        for (header, value) in &headers {
            request = request.header(header.as_str(), value.as_str());
        }
        let response = request.call()?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status == 404 {
            return Err(InventoryError::NodeNotFound(name.to_owned()));
        }
        if status >= 400 {
            let error_body = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(InventoryError::HttpResponse {
                status,
                body: error_body,
            });
        }

        let node: serde_json::Value = body_reader.read_json()?;
        Ok(NodeSnapshot::from_node_json(node)?)
    }

    fn close(&mut self) {
        tracing::debug!(url = %self.server.base_url, "Closed inventory session");
    }
}

/// Chef node names: letters, digits, `_`, `-`, `.` and `:`, not only dots.
fn is_valid_node_name(name: &str) -> bool {
    !name.chars().all(|c| c == '.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// base64(sha1(data)).
fn hash_b64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha1::digest(data))
}

/// Canonical request string for signing, per Chef authentication v1.0.
fn canonical_request(
    method: &str,
    path: &str,
    content_hash: &str,
    timestamp: &str,
    login: &str,
) -> String {
    format!(
        "Method:{}\nHashed Path:{}\nX-Ops-Content-Hash:{content_hash}\nX-Ops-Timestamp:{timestamp}\nX-Ops-UserId:{login}",
        method.to_uppercase(),
        hash_b64(path.as_bytes()),
    )
}

/// Authentication headers for one request.
fn sign_request(
    method: &str,
    path: &str,
    body: &[u8],
    login: &str,
    timestamp: &str,
    private_key: &RsaPrivateKey,
) -> Result<Vec<(String, String)>, InventoryError> {
    let content_hash = hash_b64(body);
    let canonical = canonical_request(method, path, &content_hash, timestamp, login);
    let signature = private_key.sign(Pkcs1v15Sign::new_unprefixed(), canonical.as_bytes())?;
    let signature = BASE64_STANDARD.encode(signature);

    let mut headers = vec![
        (
            "X-Ops-Sign".to_owned(),
            "algorithm=sha1;version=1.0;".to_owned(),
        ),
        ("X-Ops-Userid".to_owned(), login.to_owned()),
        ("X-Ops-Timestamp".to_owned(), timestamp.to_owned()),
        ("X-Ops-Content-Hash".to_owned(), content_hash),
    ];

    // Base64 output is ASCII, so byte chunks are valid strings.
    for (idx, chunk) in signature.as_bytes().chunks(AUTH_CHUNK).enumerate() {
        headers.push((
            format!("X-Ops-Authorization-{}", idx + 1),
            String::from_utf8_lossy(chunk).into_owned(),
        ));
    }

    Ok(headers)
}
