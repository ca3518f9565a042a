/// User quota snapshot
use serde::{Deserialize, Serialize};

/// Usage counters mirrored from the most recent backend response.
///
/// Always replaced wholesale, never merged with a prior value and never
/// computed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuota {
    /// API calls made in the current window
    pub api_calls: u64,

    /// API call ceiling for the current window
    pub api_limit: u64,

    /// Export downloads made in the current window
    pub downloads: u64,

    /// Export download ceiling for the current window
    pub download_limit: u64,

    /// Total tracks included in exports so far
    pub downloaded_tracks: u64,
}
