//! In-memory catalog state: collections, lazily-arriving track lists,
//! per-collection loading flags, and the quota snapshot.

use collector_core::types::{Collection, CollectionId, Track, UserQuota};
use std::collections::{HashMap, HashSet};

/// Catalog state mirrored from the backend.
///
/// Track lists follow a cache-once policy: once present for a collection
/// they are never re-fetched or mutated in place for the lifetime of the
/// session. The loading set is the sole duplicate-request guard.
#[derive(Debug, Default)]
pub struct Catalog {
    collections: Vec<Collection>,
    tracks: HashMap<CollectionId, Vec<Track>>,
    loading: HashSet<CollectionId>,
    quota: Option<UserQuota>,
}

impl Catalog {
    /// The loaded collection list, in backend order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// All loaded track lists, keyed by collection.
    pub fn tracks(&self) -> &HashMap<CollectionId, Vec<Track>> {
        &self.tracks
    }

    /// One collection's track list, if loaded.
    pub fn tracks_for(&self, id: &CollectionId) -> Option<&[Track]> {
        self.tracks.get(id).map(Vec::as_slice)
    }

    /// Whether a collection's track list is present.
    pub fn is_loaded(&self, id: &CollectionId) -> bool {
        self.tracks.contains_key(id)
    }

    /// Whether a collection's track fetch is in flight.
    pub fn is_loading(&self, id: &CollectionId) -> bool {
        self.loading.contains(id)
    }

    /// Whether any track fetch is in flight.
    pub fn any_loading(&self) -> bool {
        !self.loading.is_empty()
    }

    /// Most recent quota snapshot, if the backend has sent one.
    pub fn quota(&self) -> Option<&UserQuota> {
        self.quota.as_ref()
    }

    pub(crate) fn set_collections(&mut self, collections: Vec<Collection>) {
        self.collections = collections;
    }

    /// Mark a collection's track fetch in flight. Returns false if the
    /// tracks are already present or already loading, in which case the
    /// caller skips the fetch.
    pub(crate) fn begin_loading(&mut self, id: &CollectionId) -> bool {
        if self.is_loaded(id) || self.is_loading(id) {
            return false;
        }
        self.loading.insert(id.clone());
        true
    }

    /// Clear a collection's loading flag. Runs on every fetch outcome.
    pub(crate) fn finish_loading(&mut self, id: &CollectionId) {
        self.loading.remove(id);
    }

    pub(crate) fn insert_tracks(&mut self, id: &CollectionId, tracks: Vec<Track>) {
        self.tracks.insert(id.clone(), tracks);
    }

    /// Overwrite the quota snapshot wholesale, including with None: the
    /// most recent response is authoritative even when it carries none.
    pub(crate) fn set_quota(&mut self, quota: Option<UserQuota>) {
        self.quota = quota;
    }

    pub(crate) fn clear(&mut self) {
        self.collections.clear();
        self.tracks.clear();
        self.loading.clear();
        self.quota = None;
    }
}
