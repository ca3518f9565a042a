//! Unauthenticated public-collection flow.
//!
//! Accepts a raw public collection URL instead of authenticated catalog ids:
//! the backend resolves the URL to metadata and tracks, and exports run
//! against that single collection. No credential is ever attached.

use crate::client::CollectorClient;
use crate::error::{CollectorClientError, Result};
use crate::export::{parse_header_json, SKIPPED_TRACKS_HEADER, USER_QUOTA_HEADER};
use crate::types::{
    ExportDownload, PublicDownloadRequest, PublicPlaylistRequest, PublicPlaylistResponse,
    SkippedTrack,
};
use collector_core::types::{ExportFormat, TrackId, UserQuota};
use reqwest::Method;
use tracing::{debug, info};

/// Client for the unauthenticated public-collection endpoints.
pub struct PublicClient<'a> {
    client: &'a CollectorClient,
}

impl<'a> PublicClient<'a> {
    pub(crate) fn new(client: &'a CollectorClient) -> Self {
        Self { client }
    }

    /// Resolve a public collection URL to its metadata and track list.
    ///
    /// An empty URL is rejected locally; no request is sent.
    pub async fn fetch_playlist(&self, playlist_url: &str) -> Result<PublicPlaylistResponse> {
        if playlist_url.trim().is_empty() {
            return Err(CollectorClientError::Validation(
                "Please enter a playlist URL.".into(),
            ));
        }

        debug!(url = %playlist_url, "Fetching public collection");

        let request = self
            .client
            .request_public(Method::POST, "/api/public-playlist")
            .json(&PublicPlaylistRequest { playlist_url });
        let response = self.client.send(request).await?;
        let response = self.client.error_for_status(response).await?;

        let playlist: PublicPlaylistResponse = response.json().await.map_err(|e| {
            CollectorClientError::Parse(format!("Failed to parse public collection: {}", e))
        })?;

        debug!(
            collection = %playlist.playlist.id,
            tracks = playlist.tracks.len(),
            "Fetched public collection"
        );
        Ok(playlist)
    }

    /// Request an export of selected tracks from a public collection.
    ///
    /// An empty track selection is rejected locally; no request is sent.
    pub async fn download(
        &self,
        playlist_url: &str,
        selected_track_ids: &[TrackId],
        format: ExportFormat,
    ) -> Result<ExportDownload> {
        if selected_track_ids.is_empty() {
            return Err(CollectorClientError::Validation(
                "Please select at least one song.".into(),
            ));
        }

        debug!(url = %playlist_url, tracks = selected_track_ids.len(), format = %format, "Requesting public export");

        let request = self
            .client
            .request_public(Method::POST, "/api/public-playlist/download")
            .json(&PublicDownloadRequest {
                playlist_url,
                selected_track_ids,
                format,
            });
        let response = self.client.send(request).await?;
        let response = self.client.error_for_status(response).await?;

        let headers = response.headers().clone();
        let skipped_tracks: Vec<SkippedTrack> =
            parse_header_json(&headers, SKIPPED_TRACKS_HEADER).unwrap_or_default();
        let quota: Option<UserQuota> = parse_header_json(&headers, USER_QUOTA_HEADER);

        let bytes = response.bytes().await.map_err(CollectorClientError::Request)?;

        info!(size = bytes.len(), "Public export downloaded");

        Ok(ExportDownload {
            bytes: bytes.to_vec(),
            skipped_tracks,
            quota,
        })
    }
}
