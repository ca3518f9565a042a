//! Session synchronization and catalog loading for Playlist Collector.
//!
//! Reconciles the client-side "authenticated" belief with server truth
//! across the three login entry paths (redirect-code exchange, completion
//! signal, passive status check), and coordinates catalog loading with the
//! selection model so lazily-arriving track lists stay consistent with
//! what the user selected.

mod catalog;
mod error;
mod session;
pub mod signal;

// Public exports
pub use catalog::Catalog;
pub use error::{Result, SessionError};
pub use session::{AuthState, LoginEntry, SessionConfig, SessionManager};
pub use signal::{
    is_trusted_origin, AuthCompletion, AuthMessage, CompletionStore, COMPLETION_KEY,
};
