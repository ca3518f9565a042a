//! Playlist Collector Backend Client
//!
//! HTTP client library for the Playlist Collector backend API.
//!
//! # Features
//!
//! - **Credentials**: file-backed bearer token store with expiry checking
//! - **Auth**: OAuth code exchange, passive status checks
//! - **Catalog**: playlist/album listing and per-collection track fetches
//! - **Export**: authenticated and public export downloads with
//!   skipped-track and quota header handling
//!
//! # Example
//!
//! ```ignore
//! use collector_client::{ClientConfig, CollectorClient};
//! use collector_core::{CollectionKind, ExportFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://collector.example.com", "/tmp/token");
//!     let client = CollectorClient::new(config)?;
//!
//!     let status = client.status().await?;
//!     if status.authenticated {
//!         let catalog = client.catalog();
//!         let listing = catalog.list_collections(CollectionKind::Playlists).await?;
//!         println!("Found {} playlists", listing.collections.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod catalog;
mod client;
mod error;
mod export;
mod public;
mod token;
mod types;

// Re-export main types
pub use client::CollectorClient;
pub use error::{CollectorClientError, Result};
pub use token::{AuthEvent, TokenStore};
pub use types::{
    ApiErrorBody, ClientConfig, CollectionsResponse, ExportDownload, PublicPlaylistResponse,
    SkippedTrack, StatusResponse, TracksResponse,
};

// Re-export sub-clients for direct use if needed
pub use catalog::CatalogClient;
pub use export::{export_filename, ExportClient};
pub use public::PublicClient;
