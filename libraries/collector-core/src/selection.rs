//! Two-level selection model over collections and their tracks.
//!
//! Selection is a sparse map: a collection id appears in the outer map once
//! it has been interacted with, and a track id appears in an inner map only
//! once explicitly toggled or swept in by a select-all. Absent entries read
//! as unselected, not unknown.
//!
//! Track lists arrive lazily and in no particular order, so the model also
//! owns the reconciliation rule that closes the race between "collection
//! selected" and "its tracks arrived": see [`SelectionState::reconcile_loaded`].

use crate::types::{Collection, CollectionId, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One collection's contribution to an export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    /// Selected collection
    pub playlist_id: CollectionId,

    /// Selected track ids within it, in track-list order
    pub track_ids: Vec<TrackId>,
}

/// The selection state machine.
///
/// The collection flag is independent of its tracks: a collection can be
/// marked selected with no tracks individually checked (it then contributes
/// nothing to the export snapshot), and toggling one track never touches its
/// siblings or the parent flag.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    collections: HashMap<CollectionId, bool>,
    tracks: HashMap<CollectionId, HashMap<TrackId, bool>>,
}

impl SelectionState {
    /// Select or deselect every collection at once.
    ///
    /// Both selection maps are rebuilt wholesale. When selecting, every
    /// already-loaded track list is swept to all-true; ids whose tracks are
    /// not loaded yet are returned so the caller can fetch them (the sweep
    /// then happens through [`Self::reconcile_loaded`] on arrival). When
    /// deselecting, every inner map is reset to empty, which reads as
    /// all-false.
    pub fn set_all_collections(
        &mut self,
        collections: &[Collection],
        loaded: &HashMap<CollectionId, Vec<Track>>,
        checked: bool,
    ) -> Vec<CollectionId> {
        let mut needs_fetch = Vec::new();
        let mut new_collections = HashMap::new();
        let mut new_tracks = HashMap::new();

        for collection in collections {
            new_collections.insert(collection.id.clone(), checked);
            if checked {
                if let Some(tracks) = loaded.get(&collection.id) {
                    new_tracks.insert(collection.id.clone(), sweep_all(tracks));
                } else {
                    needs_fetch.push(collection.id.clone());
                }
            } else {
                new_tracks.insert(collection.id.clone(), HashMap::new());
            }
        }

        self.collections = new_collections;
        self.tracks = new_tracks;
        needs_fetch
    }

    /// Select or deselect a single collection.
    ///
    /// Selecting sweeps its track list to all-true if loaded; otherwise
    /// returns `true` to request a fetch (arrival triggers the sweep via
    /// [`Self::reconcile_loaded`]). Deselecting resets the inner map to
    /// empty rather than enumerating false for every id.
    pub fn set_collection(
        &mut self,
        id: &CollectionId,
        tracks: Option<&[Track]>,
        checked: bool,
    ) -> bool {
        self.collections.insert(id.clone(), checked);

        if checked {
            match tracks {
                Some(tracks) => {
                    self.tracks.insert(id.clone(), sweep_all(tracks));
                    false
                }
                None => true,
            }
        } else {
            self.tracks.insert(id.clone(), HashMap::new());
            false
        }
    }

    /// Toggle a single track.
    ///
    /// Never affects sibling tracks or the parent collection's own flag.
    pub fn set_track(&mut self, collection_id: &CollectionId, track_id: &TrackId, checked: bool) {
        self.tracks
            .entry(collection_id.clone())
            .or_default()
            .insert(track_id.clone(), checked);
    }

    /// Apply the arrival of a collection's track list.
    ///
    /// If the collection is already marked selected and its inner map is
    /// still empty, synthesize the select-all sweep that was deferred while
    /// the tracks were in flight. Keyed by arrival, so track lists landing
    /// in any order behave identically.
    pub fn reconcile_loaded(&mut self, id: &CollectionId, tracks: &[Track]) {
        let inner_empty = match self.tracks.get(id) {
            Some(inner) => inner.is_empty(),
            None => true,
        };
        if self.is_collection_selected(id) && inner_empty {
            self.tracks.insert(id.clone(), sweep_all(tracks));
        }
    }

    /// Whether a collection is marked selected. Absent reads as false.
    pub fn is_collection_selected(&self, id: &CollectionId) -> bool {
        self.collections.get(id).copied().unwrap_or(false)
    }

    /// Whether a track is marked selected. Absent reads as false.
    pub fn is_track_selected(&self, collection_id: &CollectionId, track_id: &TrackId) -> bool {
        self.tracks
            .get(collection_id)
            .and_then(|inner| inner.get(track_id))
            .copied()
            .unwrap_or(false)
    }

    /// Whether every listed collection is marked selected (false for an
    /// empty list).
    pub fn all_collections_selected(&self, collections: &[Collection]) -> bool {
        !collections.is_empty()
            && collections
                .iter()
                .all(|c| self.is_collection_selected(&c.id))
    }

    /// Number of listed collections currently marked selected.
    pub fn selected_collection_count(&self, collections: &[Collection]) -> usize {
        collections
            .iter()
            .filter(|c| self.is_collection_selected(&c.id))
            .count()
    }

    /// Number of tracks currently marked selected, in selected collections
    /// or not.
    pub fn selected_track_count(&self) -> usize {
        self.tracks
            .values()
            .map(|inner| inner.values().filter(|selected| **selected).count())
            .sum()
    }

    /// Number of selected tracks within one collection.
    pub fn selected_track_count_in(&self, collection_id: &CollectionId) -> usize {
        self.tracks
            .get(collection_id)
            .map_or(0, |inner| inner.values().filter(|selected| **selected).count())
    }

    /// Build the export snapshot: every collection flagged selected, with
    /// the subset of its track ids marked true in track-list order.
    /// Collections whose resulting subset is empty are omitted. Recomputed
    /// fresh on every call.
    pub fn export_snapshot(
        &self,
        collections: &[Collection],
        loaded: &HashMap<CollectionId, Vec<Track>>,
    ) -> Vec<SelectionEntry> {
        collections
            .iter()
            .filter(|c| self.is_collection_selected(&c.id))
            .map(|c| SelectionEntry {
                playlist_id: c.id.clone(),
                track_ids: loaded
                    .get(&c.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .filter(|t| self.is_track_selected(&c.id, &t.id))
                    .map(|t| t.id.clone())
                    .collect(),
            })
            .filter(|entry| !entry.track_ids.is_empty())
            .collect()
    }

    /// Drop all selection state.
    pub fn clear(&mut self) {
        self.collections.clear();
        self.tracks.clear();
    }
}

fn sweep_all(tracks: &[Track]) -> HashMap<TrackId, bool> {
    tracks.iter().map(|t| (t.id.clone(), true)).collect()
}
