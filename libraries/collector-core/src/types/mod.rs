//! Domain types shared across the Playlist Collector crates.

mod catalog;
mod format;
mod ids;
mod quota;

pub use catalog::{Collection, CollectionKind, Track};
pub use format::ExportFormat;
pub use ids::{CollectionId, TrackId};
pub use quota::UserQuota;
