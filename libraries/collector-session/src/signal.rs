//! Login completion signaling.
//!
//! A login flow finishes outside this process (the user's browser). The
//! result travels back on one of two channels:
//!
//! - a completion record dropped at a well-known shared-storage location,
//!   picked up at startup (covers the flow finishing before any listener
//!   was attached), or
//! - an inbound message carrying the same payload plus its sender origin,
//!   which must pass the origin allowlist check before the payload is
//!   trusted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Well-known shared-storage key for login completion records.
pub const COMPLETION_KEY: &str = "spotify-auth-result";

/// Maximum age of a stored completion record before it is discarded.
pub const COMPLETION_MAX_AGE_MS: i64 = 30_000;

/// Result of a login flow, as delivered by the completing side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCompletion {
    /// Whether the login succeeded
    pub success: bool,
    /// Bearer credential, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Error text, on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix milliseconds at which the record was written
    pub timestamp: i64,
}

impl AuthCompletion {
    /// A successful completion carrying a credential, stamped now.
    pub fn success(token: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
            error: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// A failed completion carrying error text, stamped now.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            error: Some(error.into()),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Whether the record is within the freshness window.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp < COMPLETION_MAX_AGE_MS
    }
}

/// An inbound completion message with its sender origin attached.
///
/// The origin has not been checked; callers run it through
/// [`is_trusted_origin`] before trusting the payload.
#[derive(Debug, Clone)]
pub struct AuthMessage {
    /// Origin of the sending side, e.g. "https://collector.example.com"
    pub origin: String,
    /// The completion payload
    pub completion: AuthCompletion,
}

/// File-backed store for the shared completion record.
#[derive(Debug, Clone)]
pub struct CompletionStore {
    path: PathBuf,
}

impl CompletionStore {
    /// Store the completion record under `dir`, at the well-known key.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(COMPLETION_KEY),
        }
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a completion record (the completing side of the handshake).
    pub fn write(&self, completion: &AuthCompletion) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(completion)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }

    /// Consume a pending completion record.
    ///
    /// A readable record is deleted whether fresh or stale, so it is
    /// processed at most once; only a fresh one is returned. An unparsable
    /// record is logged and left alone.
    pub fn take_fresh(&self) -> Option<AuthCompletion> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let completion: AuthCompletion = match serde_json::from_str(&raw) {
            Ok(completion) => completion,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unparsable completion record");
                return None;
            }
        };

        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to delete completion record");
        }

        if completion.is_fresh(Utc::now().timestamp_millis()) {
            debug!(success = completion.success, "Consumed login completion record");
            Some(completion)
        } else {
            debug!("Discarded stale login completion record");
            None
        }
    }
}

/// Whether a message origin matches the backend origin.
///
/// Compares scheme, host, and effective port; anything that fails to parse
/// is untrusted.
pub fn is_trusted_origin(origin: &str, backend_url: &str) -> bool {
    let (Ok(origin), Ok(backend)) = (Url::parse(origin), Url::parse(backend_url)) else {
        return false;
    };

    origin.scheme() == backend.scheme()
        && origin.host_str() == backend.host_str()
        && origin.port_or_known_default() == backend.port_or_known_default()
}
