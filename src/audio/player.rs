use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::PlaybackError;

use super::backend::Notifier;
use super::thread::{AudioThreadConfig, spawn_audio_thread};
use super::types::{AudioCmd, AudioEvent, PlaybackHandle, PlaybackInfo};

/// Front door to the audio thread: commands go in over a channel, state comes
/// back through the shared [`PlaybackHandle`] and the event receiver.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new<N>(
        notifier: N,
        config: AudioThreadConfig,
    ) -> Result<(Self, Receiver<AudioEvent>), PlaybackError>
    where
        N: Notifier + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (event_tx, event_rx) = mpsc::channel::<AudioEvent>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo {
            repeat: config.repeat,
            ..PlaybackInfo::default()
        }));

        let audio_handle =
            spawn_audio_thread(rx, event_tx, playback_info.clone(), notifier, config)?;

        Ok((
            Self {
                tx,
                playback: playback_info,
                join: Mutex::new(Some(audio_handle)),
            },
            event_rx,
        ))
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
