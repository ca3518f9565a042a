//! Catalog listing operations: collections and per-collection tracks.

use crate::client::CollectorClient;
use crate::error::{CollectorClientError, Result};
use crate::types::{CollectionsResponse, TracksResponse};
use collector_core::types::{CollectionId, CollectionKind};
use reqwest::Method;
use tracing::debug;

/// Catalog client for the Playlist Collector backend.
pub struct CatalogClient<'a> {
    client: &'a CollectorClient,
}

impl<'a> CatalogClient<'a> {
    pub(crate) fn new(client: &'a CollectorClient) -> Self {
        Self { client }
    }

    /// List the user's collections for one endpoint family, together with
    /// the quota snapshot the backend attaches.
    pub async fn list_collections(&self, kind: CollectionKind) -> Result<CollectionsResponse> {
        let path = format!("/api/{}", kind.path_segment());
        debug!(path = %path, "Fetching collection list");

        let response = self.client.send(self.client.request(Method::GET, &path)).await?;
        let response = self.client.error_for_status(response).await?;

        let listing: CollectionsResponse = response.json().await.map_err(|e| {
            CollectorClientError::Parse(format!("Failed to parse collection list: {}", e))
        })?;

        debug!(collections = listing.collections.len(), "Fetched collection list");
        Ok(listing)
    }

    /// Fetch one collection's track list.
    pub async fn list_tracks(
        &self,
        kind: CollectionKind,
        id: &CollectionId,
    ) -> Result<TracksResponse> {
        let path = format!("/api/{}/{}/tracks", kind.path_segment(), id);
        debug!(path = %path, collection = %id, "Fetching tracks");

        let response = self.client.send(self.client.request(Method::GET, &path)).await?;
        let response = self.client.error_for_status(response).await?;

        let tracks: TracksResponse = response.json().await.map_err(|e| {
            CollectorClientError::Parse(format!("Failed to parse track list: {}", e))
        })?;

        debug!(collection = %id, tracks = tracks.tracks.len(), "Fetched tracks");
        Ok(tracks)
    }
}
