//! Persisted library adjustments: which tracks the user deleted and which
//! external tracks they added.
//!
//! Everything lives in a single JSON document with two keys, `deleted_ids`
//! and `added_songs`. Writes go through a temp file and a rename so a crash
//! never leaves half a document behind.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;

use super::model::{Locator, Track, TrackId};

/// One user-added track as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTrackRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "unknown")]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub uri: String,
    #[serde(rename = "durationMs", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl AddedTrackRecord {
    pub fn from_track(track: &Track) -> Self {
        Self {
            id: track.id.get(),
            title: track.title.clone(),
            artist: track.artist.clone().unwrap_or_default(),
            uri: track.locator.to_uri(),
            duration_ms: track.duration.map(|d| d.as_millis() as u64),
        }
    }

    /// Records without an id or a parseable locator are dropped.
    pub fn to_track(&self) -> Option<Track> {
        let id = TrackId::new(self.id)?;
        let locator = Locator::parse(&self.uri)?;
        Some(Track::new(
            id,
            self.title.clone(),
            Some(self.artist.as_str()),
            locator,
            self.duration_ms.filter(|&ms| ms > 0).map(Duration::from_millis),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryAdjustments {
    pub deleted_ids: BTreeSet<TrackId>,
    pub added_songs: Vec<AddedTrackRecord>,
}

impl LibraryAdjustments {
    pub fn is_deleted(&self, id: TrackId) -> bool {
        self.deleted_ids.contains(&id)
    }

    pub fn added_tracks(&self) -> Vec<Track> {
        self.added_songs
            .iter()
            .filter_map(AddedTrackRecord::to_track)
            .collect()
    }

    /// Insert or replace the record with the same id.
    pub fn upsert_added(&mut self, track: &Track) {
        let record = AddedTrackRecord::from_track(track);
        match self.added_songs.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.added_songs.push(record),
        }
    }

    pub fn remove_added(&mut self, id: TrackId) {
        self.added_songs.retain(|r| r.id != id.get());
    }
}

/// File-backed store for [`LibraryAdjustments`].
#[derive(Debug, Clone)]
pub struct AdjustmentStore {
    path: Option<PathBuf>,
}

impl AdjustmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store that never touches disk, used when no data directory exists.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the document. A missing file is an empty document.
    pub fn read(&self) -> Result<LibraryAdjustments, StoreError> {
        let Some(path) = &self.path else {
            return Ok(LibraryAdjustments::default());
        };
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LibraryAdjustments::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(LibraryAdjustments::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Like [`read`](Self::read) but logs failures and falls back to an empty document.
    pub fn load(&self) -> LibraryAdjustments {
        match self.read() {
            Ok(adj) => adj,
            Err(e) => {
                warn!(error = %e, "library store unreadable, starting empty");
                LibraryAdjustments::default()
            }
        }
    }

    pub fn write(&self, adjustments: &LibraryAdjustments) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(adjustments)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut LibraryAdjustments)) -> Result<(), StoreError> {
        let mut adj = self.read()?;
        f(&mut adj);
        self.write(&adj)
    }

    pub fn mark_deleted(&self, id: TrackId) -> Result<(), StoreError> {
        self.update(|adj| {
            adj.deleted_ids.insert(id);
        })
    }

    pub fn persist_added(&self, track: &Track) -> Result<(), StoreError> {
        self.update(|adj| adj.upsert_added(track))
    }

    pub fn remove_added(&self, id: TrackId) -> Result<(), StoreError> {
        self.update(|adj| adj.remove_added(id))
    }
}
