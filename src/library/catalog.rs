//! The merged, deduplicated track list shown to the user.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::StoreError;

use super::model::{Locator, Track, TrackId};
use super::scan::scan_dirs;
use super::store::{AdjustmentStore, LibraryAdjustments};

pub const DEMO_ARTIST: &str = "SoundHelix";

/// The five tracks bundled with the player.
pub fn demo_tracks() -> Vec<Track> {
    (1..=5)
        .filter_map(|n| {
            TrackId::new(1000 + n).map(|id| {
                Track::new(
                    id,
                    format!("Demo Song {n}"),
                    Some(DEMO_ARTIST),
                    Locator::Bundled(format!("song{n}.mp3")),
                    None,
                )
            })
        })
        .collect()
}

/// The demo set when it is enabled and has a directory to play from.
pub fn demo_source(include_demo: bool, demo_dir: Option<&Path>) -> Vec<Track> {
    if !include_demo {
        return Vec::new();
    }
    if demo_dir.is_none() {
        warn!("no demo directory (set library.demo_dir or HOME); leaving out demo tracks");
        return Vec::new();
    }
    demo_tracks()
}

/// Concatenate the sources in order, keeping the first descriptor per id,
/// dropping deleted ids and appending persisted additions that are new.
pub fn merge_catalog(
    sources: impl IntoIterator<Item = Vec<Track>>,
    adjustments: &LibraryAdjustments,
) -> Vec<Track> {
    let mut seen: HashSet<TrackId> = HashSet::new();
    let mut merged: Vec<Track> = Vec::new();

    let persisted = adjustments.added_tracks();
    for track in sources.into_iter().flatten().chain(persisted) {
        if adjustments.is_deleted(track.id) || !seen.insert(track.id) {
            continue;
        }
        merged.push(track);
    }
    merged
}

pub struct Catalog {
    tracks: Vec<Track>,
    store: AdjustmentStore,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>, store: AdjustmentStore) -> Self {
        Self { tracks, store }
    }

    /// Build the catalog from the demo set, the scanned music directories and
    /// the persisted adjustments.
    pub fn load(settings: &Settings, store: AdjustmentStore) -> Self {
        let demo = demo_source(settings.library.include_demo, settings.demo_dir().as_deref());
        let dirs = settings.music_dirs();
        let indexed = scan_dirs(&dirs, &settings.library);
        let adjustments = store.load();

        let tracks = merge_catalog([demo, indexed], &adjustments);
        info!(
            tracks = tracks.len(),
            deleted = adjustments.deleted_ids.len(),
            added = adjustments.added_songs.len(),
            "catalog loaded"
        );
        Self::new(tracks, store)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Add an externally found track. The record is persisted (replacing any
    /// record with the same id) even when the list already holds the id.
    /// Returns whether the in-memory list grew.
    pub fn add_external(&mut self, track: Track) -> Result<bool, StoreError> {
        self.store.persist_added(&track)?;
        if self.contains(track.id) {
            return Ok(false);
        }
        self.tracks.push(track);
        Ok(true)
    }

    /// Remove a track from the list and from persisted additions, and remember
    /// the deletion so the next load does not bring it back. The in-memory
    /// removal happens even if persisting fails.
    pub fn delete(&mut self, id: TrackId) -> Result<Option<Track>, StoreError> {
        let removed = self
            .position_of(id)
            .map(|pos| self.tracks.remove(pos));

        self.store.mark_deleted(id)?;
        if let Err(e) = self.store.remove_added(id) {
            warn!(%id, error = %e, "failed to drop persisted record");
            return Err(e);
        }
        Ok(removed)
    }
}
