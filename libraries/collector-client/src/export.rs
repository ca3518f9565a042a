//! Export downloads for the authenticated selection.

use crate::client::CollectorClient;
use crate::error::{CollectorClientError, Result};
use crate::types::{DownloadRequest, ExportDownload, SkippedTrack};
use collector_core::selection::SelectionEntry;
use collector_core::types::{ExportFormat, UserQuota};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Response header carrying tracks the backend could not process.
pub(crate) const SKIPPED_TRACKS_HEADER: &str = "x-skipped-tracks";
/// Response header carrying the updated quota snapshot.
pub(crate) const USER_QUOTA_HEADER: &str = "x-user-quota";

/// Fixed output filename for an export.
pub fn export_filename(format: ExportFormat) -> String {
    format!("spotify_export.{}", format.extension())
}

/// Export client for the Playlist Collector backend.
pub struct ExportClient<'a> {
    client: &'a CollectorClient,
}

impl<'a> ExportClient<'a> {
    pub(crate) fn new(client: &'a CollectorClient) -> Self {
        Self { client }
    }

    /// Request an export file for the given selection snapshot.
    ///
    /// An empty selection is rejected locally; no request is sent. The
    /// optional skipped-tracks and quota headers are parsed best-effort: a
    /// malformed header is logged and ignored, never failing the download.
    pub async fn download(
        &self,
        selection: &[SelectionEntry],
        format: ExportFormat,
    ) -> Result<ExportDownload> {
        if selection.is_empty() {
            return Err(CollectorClientError::Validation(
                "Please select at least one playlist and song.".into(),
            ));
        }

        debug!(collections = selection.len(), format = %format, "Requesting export");

        let request = self
            .client
            .request(Method::POST, "/api/download")
            .json(&DownloadRequest { selection, format });
        let response = self.client.send(request).await?;
        let response = self.client.error_for_status(response).await?;

        let headers = response.headers().clone();
        let skipped_tracks: Vec<SkippedTrack> =
            parse_header_json(&headers, SKIPPED_TRACKS_HEADER).unwrap_or_default();
        let quota: Option<UserQuota> = parse_header_json(&headers, USER_QUOTA_HEADER);

        let bytes = response.bytes().await.map_err(CollectorClientError::Request)?;

        info!(
            size = bytes.len(),
            skipped = skipped_tracks.len(),
            "Export downloaded"
        );

        Ok(ExportDownload {
            bytes: bytes.to_vec(),
            skipped_tracks,
            quota,
        })
    }
}

/// Parse a JSON-encoded response header. Parse failures are logged and
/// swallowed.
pub(crate) fn parse_header_json<T: DeserializeOwned>(headers: &HeaderMap, name: &str) -> Option<T> {
    let value = headers.get(name)?;
    let raw = match value.to_str() {
        Ok(raw) => raw,
        Err(e) => {
            warn!(header = name, error = %e, "Ignoring non-text response header");
            return None;
        }
    };
    match serde_json::from_str(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(header = name, error = %e, "Ignoring malformed response header");
            None
        }
    }
}
