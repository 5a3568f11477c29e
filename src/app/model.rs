//! Application model types: `App`, `View` and `PlaybackState`.
//!
//! The `App` struct owns the catalog, the cursor, the filter, the search
//! dialog and the last playback snapshot read from the audio thread. It does
//! no I/O besides persisting catalog changes; the runtime turns its answers
//! into audio commands and worker requests.

use std::time::{Duration, Instant};

use crate::audio::{AudioCmd, PlaybackInfo, fraction_target};
use crate::error::StoreError;
use crate::library::{Catalog, Track, TrackId};
use crate::search::SearchOutcome;

use super::dialog::SearchDialog;

/// The playback state of the application.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Which screen the main area shows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Library,
    Detail(TrackId),
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    expires_at: Instant,
}

/// The main application model.
pub struct App {
    catalog: Catalog,
    pub selected: usize,
    pub playback: PlaybackInfo,

    lower_titles: Option<Vec<String>>,

    pub follow_playback: bool,

    pub filter_mode: bool,
    pub filter_query: String,

    pub view: View,
    pub search: Option<SearchDialog>,
    last_generation: u64,

    toast: Option<Toast>,
    toast_ttl: Duration,
}

impl App {
    /// Create a new `App` over `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        let mut app = Self {
            catalog,
            selected: 0,
            playback: PlaybackInfo::default(),

            lower_titles: None,

            follow_playback: true,

            filter_mode: false,
            filter_query: String::new(),

            view: View::Library,
            search: None,
            last_generation: 0,

            toast: None,
            toast_ttl: Duration::from_secs(3),
        };
        app.rebuild_index();
        app
    }

    pub fn set_toast_ttl(&mut self, ttl: Duration) {
        self.toast_ttl = ttl;
    }

    pub fn tracks(&self) -> &[Track] {
        self.catalog.tracks()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.catalog.get(self.selected)
    }

    // For larger libraries, precompute lowercase titles to speed up fuzzy
    // filtering on every redraw and keystroke.
    fn rebuild_index(&mut self) {
        self.lower_titles = if self.catalog.len() > 100 {
            Some(
                self.catalog
                    .tracks()
                    .iter()
                    .map(|t| t.display().to_ascii_lowercase())
                    .collect(),
            )
        } else {
            None
        };
    }

    /// Return true if this `App` uses precomputed lowercase titles.
    pub fn uses_lower_titles(&self) -> bool {
        self.lower_titles.is_some()
    }

    // ---- playback snapshot ----

    /// Store the latest snapshot from the audio thread and move the cursor
    /// to the playing track when following playback.
    pub fn sync_playback(&mut self, info: PlaybackInfo) {
        if self.follow_playback && !self.filter_mode {
            if let Some(pos) = info
                .current
                .as_ref()
                .and_then(|t| self.catalog.position_of(t.id))
            {
                if pos != self.selected {
                    self.set_selected(pos);
                }
            }
        }
        self.playback = info;
    }

    pub fn playback_state(&self) -> PlaybackState {
        match (&self.playback.current, self.playback.playing) {
            (None, _) => PlaybackState::Stopped,
            (Some(_), true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
        }
    }

    pub fn is_playing_track(&self, track: &Track) -> bool {
        self.playback.playing && self.playback.is_current(track)
    }

    /// The command a play/pause toggle on `track` should send: pause when it
    /// is the track playing right now, play it otherwise.
    pub fn toggle_command(&self, track: &Track) -> AudioCmd {
        if self.is_playing_track(track) {
            AudioCmd::Pause
        } else {
            AudioCmd::Play(track.clone())
        }
    }

    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    // ---- filter and navigation ----

    /// Return the display order of track indices, taking the active filter
    /// into account.
    pub fn display_indices(&self) -> Vec<usize> {
        let base = 0..self.catalog.len();

        let query = self.filter_query.trim();
        if query.is_empty() {
            return base.collect();
        }
        match self.lower_titles.as_deref() {
            Some(lower_titles) => {
                let query_lower = query.to_ascii_lowercase();
                base.filter(|&i| {
                    Self::fuzzy_match_positions_lower(&lower_titles[i], &query_lower).is_some()
                })
                .collect()
            }
            None => base
                .filter(|&i| {
                    self.catalog
                        .get(i)
                        .is_some_and(|t| Self::fuzzy_match_positions(&t.display(), query).is_some())
                })
                .collect(),
        }
    }

    /// Fuzzy-match `query_lower` against a specific track by index.
    ///
    /// Returns the character positions that match, or `None` when there is no match.
    pub fn fuzzy_match_positions_for_track_lower(
        &self,
        track_index: usize,
        query_lower: &str,
    ) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }

        match self.lower_titles.as_deref() {
            Some(lower_titles) => {
                Self::fuzzy_match_positions_lower(lower_titles.get(track_index)?, query_lower)
            }
            None => Self::fuzzy_match_positions(
                &self.catalog.get(track_index)?.display(),
                query_lower,
            ),
        }
    }

    /// Fuzzy/subsequence match: return the character positions in `title`
    /// that match `query`, or `None` if not matched.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        if query.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title.chars().enumerate();

        for qc in query.chars() {
            let qc_low = qc.to_ascii_lowercase();
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc.to_ascii_lowercase() == qc_low => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    fn fuzzy_match_positions_lower(title_lower: &str, query_lower: &str) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title_lower.chars().enumerate();

        for qc in query_lower.chars() {
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc == qc => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    /// Return the next visible index after `current`, wrapping to the first.
    pub fn next_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(p) => Some(display[(p + 1) % display.len()]),
            None => Some(display[0]),
        }
    }

    /// Return the previous visible index before `current`, wrapping to the last.
    pub fn prev_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(0) => Some(display[display.len() - 1]),
            Some(p) => Some(display[p - 1]),
            None => Some(display[display.len() - 1]),
        }
    }

    /// Set the selected track index and ensure it is visible in the display.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx;
        self.ensure_selected_visible();
    }

    pub fn select_first(&mut self) {
        if let Some(&first) = self.display_indices().first() {
            self.selected = first;
        }
    }

    pub fn select_last(&mut self) {
        if let Some(&last) = self.display_indices().last() {
            self.selected = last;
        }
    }

    /// Enter filter mode: enable filtering and stop following playback.
    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }

    /// Leave filter mode, keeping the query applied.
    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }

    /// Clear the active filter and restore selection visibility.
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Ensure that `selected` is part of the current filtered view,
    /// otherwise move selection to the first visible track.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            self.selected = 0;
            return;
        }

        if !display.contains(&self.selected) {
            self.selected = display[0];
        }
    }

    /// Move selection to the next visible track.
    pub fn next(&mut self) {
        if let Some(next) = self.next_in_view_from(self.selected) {
            self.selected = next;
        }
    }

    /// Move selection to the previous visible track.
    pub fn prev(&mut self) {
        if let Some(prev) = self.prev_in_view_from(self.selected) {
            self.selected = prev;
        }
    }

    // ---- detail view ----

    pub fn open_detail(&mut self) {
        if let Some(track) = self.selected_track() {
            self.view = View::Detail(track.id);
        }
    }

    pub fn close_detail(&mut self) {
        self.view = View::Library;
    }

    /// The track shown by the detail view, if it is still in the catalog.
    pub fn detail_track(&self) -> Option<&Track> {
        match self.view {
            View::Detail(id) => self
                .catalog
                .position_of(id)
                .and_then(|pos| self.catalog.get(pos)),
            View::Library => None,
        }
    }

    /// Where a `0`-`9` jump in the detail view lands. Only the loaded track
    /// with a known length can be jumped in.
    pub fn jump_target(&self, tenths: u32) -> Option<Duration> {
        let track = self.detail_track()?;
        if !self.playback.is_current(track) || self.playback.duration.is_zero() {
            return None;
        }
        Some(fraction_target(self.playback.duration, tenths))
    }

    // ---- catalog mutations ----

    /// Delete the selected track from the catalog and its storage.
    pub fn delete_selected(&mut self) -> Result<Option<Track>, StoreError> {
        let Some(id) = self.selected_track().map(|t| t.id) else {
            return Ok(None);
        };
        let removed = self.catalog.delete(id)?;
        self.rebuild_index();

        if self.view == View::Detail(id) {
            self.view = View::Library;
        }
        let last = self.catalog.len().saturating_sub(1);
        self.selected = self.selected.min(last);
        self.ensure_selected_visible();
        Ok(removed)
    }

    /// Add a track found by search. Returns whether the list grew.
    pub fn add_external(&mut self, track: Track) -> Result<bool, StoreError> {
        let added = self.catalog.add_external(track)?;
        if added {
            self.rebuild_index();
        }
        Ok(added)
    }

    // ---- search dialog ----

    pub fn open_search(&mut self) {
        self.search = Some(SearchDialog::new());
    }

    /// Closing forgets the pending request; its answer will be dropped.
    pub fn close_search(&mut self) {
        self.search = None;
    }

    /// Mark the open dialog as waiting for a new request and return the
    /// generation and query to run. Blank queries start nothing.
    pub fn begin_search(&mut self) -> Option<(u64, String)> {
        let dialog = self.search.as_mut()?;
        let query = dialog.query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        self.last_generation += 1;
        dialog.generation = self.last_generation;
        dialog.loading = true;
        dialog.error = None;
        dialog.editing = false;
        Some((self.last_generation, query))
    }

    /// Apply a finished search if the dialog is still waiting for it.
    /// Returns false when the outcome was stale and dropped.
    pub fn apply_search(&mut self, outcome: SearchOutcome) -> bool {
        let Some(dialog) = self.search.as_mut() else {
            return false;
        };
        if dialog.generation != outcome.generation {
            return false;
        }
        dialog.loading = false;
        match outcome.result {
            Ok(results) => {
                dialog.results = results;
                dialog.selected = 0;
                dialog.error = None;
            }
            Err(e) => {
                dialog.results.clear();
                dialog.selected = 0;
                dialog.error = Some(format!("Search failed: {e}"));
            }
        }
        true
    }

    /// The track the current context acts on: the highlighted search result
    /// while the dialog is open, the detail track or the cursor otherwise.
    pub fn focused_track(&self) -> Option<&Track> {
        if let Some(dialog) = &self.search {
            return dialog.selected_result();
        }
        self.detail_track().or_else(|| self.selected_track())
    }

    // ---- toasts ----

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notify_at(message, Instant::now());
    }

    pub fn notify_at(&mut self, message: impl Into<String>, now: Instant) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: now + self.toast_ttl,
        });
    }

    pub fn toast(&self) -> Option<&str> {
        self.toast.as_ref().map(|t| t.message.as_str())
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
        }
    }
}
