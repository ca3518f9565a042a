/// Catalog domain types
use crate::types::{CollectionId, TrackId};
use serde::{Deserialize, Serialize};

/// A collection of tracks as returned by the backend.
///
/// Covers both playlists and albums; the two endpoint families share one
/// response shape. Immutable once fetched, identified by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Unique collection identifier
    pub id: CollectionId,

    /// Display name
    pub name: String,

    /// Track count as reported by the backend, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
}

impl Collection {
    /// Create a new collection
    pub fn new(id: impl Into<CollectionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            track_count: None,
        }
    }
}

/// A track within one collection's track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Credited artists, in order
    pub artists: Vec<String>,

    /// Album name, if the backend includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl Track {
    /// Create a new track
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists,
            album: None,
        }
    }
}

/// Which endpoint family a catalog request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// `/api/playlists` and `/api/playlists/:id/tracks`
    #[default]
    Playlists,
    /// `/api/albums` and `/api/albums/:id/tracks`
    Albums,
}

impl CollectionKind {
    /// URL path segment for this endpoint family
    pub fn path_segment(&self) -> &'static str {
        match self {
            CollectionKind::Playlists => "playlists",
            CollectionKind::Albums => "albums",
        }
    }
}

