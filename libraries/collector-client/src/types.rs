//! Types for Playlist Collector backend requests and responses.

use collector_core::selection::SelectionEntry;
use collector_core::types::{Collection, ExportFormat, Track, TrackId, UserQuota};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for connecting to the Playlist Collector backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend (e.g., "https://collector.example.com")
    pub base_url: String,
    /// File the bearer credential is persisted at
    pub token_path: PathBuf,
}

impl ClientConfig {
    /// Create a new client config.
    pub fn new(base_url: impl Into<String>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            token_path: token_path.into(),
        }
    }
}

// =============================================================================
// Authentication Types
// =============================================================================

/// Response from the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Whether the backend considers this session authenticated
    pub authenticated: bool,
    /// Quota snapshot, when the backend includes one
    #[serde(default)]
    pub quota: Option<UserQuota>,
}

/// Request body for the OAuth code exchange.
#[derive(Debug, Serialize)]
pub(crate) struct ExchangeRequest<'a> {
    pub code: &'a str,
}

/// Response from the OAuth code exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeResponse {
    pub token: String,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// Collection listing plus quota snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionsResponse {
    /// The user's collections. The playlist and album endpoint families use
    /// different body keys for the same shape.
    #[serde(alias = "playlists", alias = "albums")]
    pub collections: Vec<Collection>,
    /// Quota snapshot, when the backend includes one
    #[serde(default)]
    pub quota: Option<UserQuota>,
}

/// One collection's track list plus quota snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    /// Tracks in collection order
    pub tracks: Vec<Track>,
    /// Quota snapshot, when the backend includes one
    #[serde(default)]
    pub quota: Option<UserQuota>,
}

// =============================================================================
// Export Types
// =============================================================================

/// Request body for an authenticated export.
#[derive(Debug, Serialize)]
pub(crate) struct DownloadRequest<'a> {
    pub selection: &'a [SelectionEntry],
    pub format: ExportFormat,
}

/// A track the backend could not include in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedTrack {
    /// Track title
    pub title: String,
    /// Name of the collection it belongs to
    pub playlist_name: String,
}

/// Result of an export download.
///
/// `skipped_tracks` and `quota` come from optional response headers and are
/// parsed best-effort; a malformed header leaves them empty/None.
#[derive(Debug, Clone)]
pub struct ExportDownload {
    /// The export file body
    pub bytes: Vec<u8>,
    /// Tracks the backend reported as skipped
    pub skipped_tracks: Vec<SkippedTrack>,
    /// Updated quota snapshot, if the backend sent one
    pub quota: Option<UserQuota>,
}

// =============================================================================
// Public (unauthenticated) Types
// =============================================================================

/// Request body for fetching a public collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublicPlaylistRequest<'a> {
    pub playlist_url: &'a str,
}

/// Metadata and tracks of a public collection.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicPlaylistResponse {
    /// The collection itself
    pub playlist: Collection,
    /// Its full track list
    pub tracks: Vec<Track>,
}

/// Request body for a public-collection export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublicDownloadRequest<'a> {
    pub playlist_url: &'a str,
    pub selected_track_ids: &'a [TrackId],
    pub format: ExportFormat,
}

// =============================================================================
// Error Types
// =============================================================================

/// Error body the backend attaches to failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Human-readable error text
    #[serde(default)]
    pub error: String,
    /// Rate-limit reset guidance, when applicable
    #[serde(default)]
    pub reset_time: Option<String>,
}
