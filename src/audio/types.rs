//! Audio-related small types and handles.
//!
//! This module defines the commands accepted by the audio thread, the events
//! it reports back and the playback snapshot shared with the UI.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::library::Track;

#[derive(Debug)]
pub enum AudioCmd {
    /// Play the given track, or resume it if it is already current.
    Play(Track),
    /// Pause if playing.
    Pause,
    /// Resume if a track is loaded and paused.
    Resume,
    /// Pause when playing, resume otherwise.
    TogglePause,
    /// Seek to an absolute position.
    SeekTo(Duration),
    /// Jump back by the given amount, clamped at zero.
    Rewind(Duration),
    /// Jump forward by the given amount, clamped at the track duration.
    Forward(Duration),
    ToggleRepeat,
    SetRepeat(bool),
    /// Pause, remove the notification and end the session.
    Dismiss,
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Things the audio thread wants the UI to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    /// A track could not be opened or played.
    PlaybackFailed { title: String, message: String },
}

/// Runtime playback information shared with the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackInfo {
    /// The track loaded in the player, if any.
    pub current: Option<Track>,
    /// Whether playback is currently active.
    pub playing: bool,
    /// Position within the current track.
    pub position: Duration,
    /// Total length reported by the player (zero when unknown).
    pub duration: Duration,
    /// Whether the current track loops when it ends.
    pub repeat: bool,
}

impl PlaybackInfo {
    pub fn is_current(&self, track: &Track) -> bool {
        self.current.as_ref().is_some_and(|c| c.id == track.id)
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
