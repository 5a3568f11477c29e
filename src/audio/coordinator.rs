//! The playback session coordinator.
//!
//! Owns at most one player handle at a time, mirrors its state into the
//! shared [`PlaybackInfo`] snapshot and republishes the notification after
//! every command. All methods run on the audio thread, so there is exactly
//! one writer.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::library::Track;

use super::backend::{MediaBackend, Notifier, NowPlaying, PlayerHandle};
use super::types::{PlaybackHandle, PlaybackInfo};

/// Target of a rewind: never before the start.
pub fn rewind_target(position: Duration, step: Duration) -> Duration {
    position.saturating_sub(step)
}

/// Target of a forward jump: never past the end when the length is known.
pub fn forward_target(position: Duration, duration: Duration, step: Duration) -> Duration {
    let target = position.saturating_add(step);
    if duration.is_zero() {
        target
    } else {
        target.min(duration)
    }
}

/// Absolute jump to `tenths`/10 of the track. Ten and above land at the end.
pub fn fraction_target(duration: Duration, tenths: u32) -> Duration {
    duration * tenths.min(10) / 10
}

pub struct Coordinator<B: MediaBackend, N: Notifier> {
    backend: B,
    notifier: N,
    handle: Option<B::Handle>,
    current: Option<Track>,
    playing: bool,
    repeat: bool,
    info: PlaybackHandle,
}

impl<B: MediaBackend, N: Notifier> Coordinator<B, N> {
    pub fn new(backend: B, notifier: N, info: PlaybackHandle, repeat: bool) -> Self {
        let coordinator = Self {
            backend,
            notifier,
            handle: None,
            current: None,
            playing: false,
            repeat,
            info,
        };
        coordinator.sync_info();
        coordinator
    }

    /// Play `track`. The current track is resumed (or left alone when already
    /// playing); any other track replaces the current handle.
    ///
    /// On failure the session is left idle with the notification removed.
    pub fn play(&mut self, track: Track) -> Result<(), PlaybackError> {
        let same = self.current.as_ref().is_some_and(|c| c.id == track.id);
        if same {
            if let Some(handle) = self.handle.as_mut() {
                if !handle.is_playing() {
                    handle.start();
                    self.playing = true;
                    self.publish();
                }
                self.sync_info();
                return Ok(());
            }
        }

        self.release_handle();
        match self.backend.open(&track) {
            Ok(mut handle) => {
                handle.set_looping(self.repeat);
                handle.start();
                info!(id = %track.id, title = %track.title, locator = %track.locator, "playing");
                self.handle = Some(handle);
                self.current = Some(track);
                self.playing = true;
                self.publish();
                self.sync_info();
                Ok(())
            }
            Err(e) => {
                warn!(id = %track.id, locator = %track.locator, error = %e, "failed to open track");
                self.current = None;
                self.playing = false;
                self.notifier.clear();
                self.sync_info();
                Err(e)
            }
        }
    }

    /// Suspend playback. Does nothing when nothing is playing.
    pub fn pause(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if !handle.is_playing() {
            return;
        }
        handle.pause();
        self.playing = false;
        self.publish();
        self.sync_info();
    }

    /// Resume a loaded, paused track.
    pub fn resume(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if handle.is_playing() {
            return;
        }
        handle.start();
        self.playing = true;
        self.publish();
        self.sync_info();
    }

    pub fn toggle_pause(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Reposition playback. Bounds are whatever the player enforces.
    pub fn seek(&mut self, to: Duration) -> Result<(), PlaybackError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        handle.seek(to)?;
        self.publish();
        self.sync_info();
        Ok(())
    }

    pub fn rewind(&mut self, step: Duration) -> Result<(), PlaybackError> {
        if self.handle.is_none() {
            return Ok(());
        }
        let target = rewind_target(self.position(), step);
        self.seek(target)
    }

    pub fn forward(&mut self, step: Duration) -> Result<(), PlaybackError> {
        if self.handle.is_none() {
            return Ok(());
        }
        let target = forward_target(self.position(), self.duration(), step);
        self.seek(target)
    }

    pub fn position(&self) -> Duration {
        self.handle
            .as_ref()
            .map_or(Duration::ZERO, PlayerHandle::position)
    }

    pub fn duration(&self) -> Duration {
        self.handle
            .as_ref()
            .map_or(Duration::ZERO, PlayerHandle::duration)
    }

    pub fn is_playing(&self) -> bool {
        self.handle.as_ref().is_some_and(PlayerHandle::is_playing)
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn toggle_repeat(&mut self) {
        self.set_repeat(!self.repeat);
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_looping(repeat);
        }
        debug!(repeat, "repeat changed");
        self.publish();
        self.sync_info();
    }

    /// Pause, remove the notification and end the session.
    pub fn dismiss(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
        }
        self.notifier.clear();
        self.release_handle();
        self.current = None;
        self.playing = false;
        info!("session dismissed");
        self.sync_info();
    }

    /// Periodic housekeeping: notice when a track ran out and refresh the
    /// shared snapshot.
    pub fn tick(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if handle.poll_completed() {
                debug!("track completed");
                self.playing = false;
                self.publish();
            }
        }
        self.sync_info();
    }

    /// Fade out and release everything before the audio thread exits.
    pub fn shutdown(&mut self, fade_out: Duration) {
        if let Some(handle) = self.handle.as_mut() {
            if handle.is_playing() && !fade_out.is_zero() {
                let steps: u32 = 20;
                let step = (fade_out / steps).max(Duration::from_millis(1));
                for i in 1..=steps {
                    handle.set_volume(1.0 - i as f32 / steps as f32);
                    thread::sleep(step);
                }
            }
            handle.set_volume(0.0);
        }
        self.notifier.clear();
        self.release_handle();
        self.current = None;
        self.playing = false;
        self.sync_info();
    }

    fn release_handle(&mut self) {
        if let Some(mut old) = self.handle.take() {
            old.release();
        }
    }

    fn publish(&self) {
        let Some(track) = self.current.as_ref() else {
            return;
        };
        self.notifier.publish(&NowPlaying {
            track: track.clone(),
            ongoing: self.playing,
            repeat: self.repeat,
            position: self.position(),
            duration: self.duration(),
        });
    }

    fn snapshot(&self) -> PlaybackInfo {
        PlaybackInfo {
            current: self.current.clone(),
            playing: self.playing && self.is_playing(),
            position: self.position(),
            duration: self.duration(),
            repeat: self.repeat,
        }
    }

    fn sync_info(&self) {
        let snapshot = self.snapshot();
        if let Ok(mut info) = self.info.lock() {
            *info = snapshot;
        }
    }
}
