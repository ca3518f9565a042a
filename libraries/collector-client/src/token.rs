//! Bearer credential persistence and validity checking.
//!
//! The token is an opaque JWT handed out by the backend. It is persisted to
//! a file so it survives process restarts; validity is judged locally from
//! the `exp` claim in the middle dot-delimited segment. Anything that fails
//! to decode is treated as "no valid token" rather than an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Process-wide authentication lifecycle events.
///
/// Broadcast by [`crate::CollectorClient`] so state holders can react to
/// credential invalidation without the transport layer knowing about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A 401 response invalidated the stored credential.
    Expired,
}

/// File-backed bearer token store.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store persisting to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the credential is persisted at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a credential. A no-op for an empty token.
    pub fn set_token(&self, token: &str) -> io::Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        debug!(path = %self.path.display(), "Stored credential");
        Ok(())
    }

    /// The persisted credential, if any.
    pub fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    Some(token)
                }
            }
            Err(_) => None,
        }
    }

    /// Clear the persisted credential.
    pub fn remove_token(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove credential");
            }
        }
    }

    /// Whether a credential exists and its embedded expiry is still in the
    /// future. Fails closed: a missing or undecodable token is not valid.
    pub fn has_valid_token(&self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        match token_expiry(&token) {
            Some(exp) => exp > chrono::Utc::now().timestamp(),
            None => false,
        }
    }
}

/// Decode the `exp` claim from a JWT's payload segment.
///
/// Returns None on any shape or decode mismatch.
fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("exp")?.as_i64()
}
