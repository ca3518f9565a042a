//! Playlist Collector Core
//!
//! Platform-agnostic domain types, the selection model, and error handling
//! for Playlist Collector.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Collection`, `Track`, `UserQuota`, `ExportFormat`
//! - **Selection Model**: `SelectionState`, the two-level collection/track
//!   selection map and its export snapshot
//! - **Error Handling**: Unified `CollectorError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use collector_core::types::{Collection, Track};
//! use collector_core::SelectionState;
//! use std::collections::HashMap;
//!
//! let playlist = Collection::new("pl-1", "Road Trip");
//! let track = Track::new("tr-1", "Song One", vec!["Artist".to_string()]);
//!
//! let mut tracks = HashMap::new();
//! tracks.insert(playlist.id.clone(), vec![track]);
//!
//! let mut selection = SelectionState::default();
//! selection.set_collection(&playlist.id, tracks.get(&playlist.id).map(Vec::as_slice), true);
//! assert!(selection.is_collection_selected(&playlist.id));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod selection;
pub mod types;

// Re-export commonly used types
pub use error::{CollectorError, Result};
pub use selection::{SelectionEntry, SelectionState};
pub use types::{
    Collection, CollectionId, CollectionKind, ExportFormat, Track, TrackId, UserQuota,
};
