//! Seams between the coordinator and the things it drives: the media player
//! and the notification surface.

use std::time::Duration;

use crate::error::PlaybackError;
use crate::library::Track;

/// One opened media source. Dropping or releasing it frees the output.
pub trait PlayerHandle {
    fn start(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn position(&self) -> Duration;
    /// Total length, zero when unknown.
    fn duration(&self) -> Duration;
    fn seek(&mut self, to: Duration) -> Result<(), PlaybackError>;
    fn set_looping(&mut self, looping: bool);
    fn set_volume(&mut self, volume: f32);
    /// Housekeeping; returns true once when a non-looping source ran out.
    fn poll_completed(&mut self) -> bool;
    fn release(&mut self);
}

/// Opens player handles for tracks.
pub trait MediaBackend {
    type Handle: PlayerHandle;

    fn open(&mut self, track: &Track) -> Result<Self::Handle, PlaybackError>;
}

/// What the notification surface shows for the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    /// Ongoing (not dismissible) while playing.
    pub ongoing: bool,
    pub repeat: bool,
    pub position: Duration,
    pub duration: Duration,
}

/// The persistent "now playing" notification.
pub trait Notifier {
    fn publish(&self, notice: &NowPlaying);
    fn clear(&self);
}
