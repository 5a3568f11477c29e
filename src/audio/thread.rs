use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PlaybackError;

use super::backend::{MediaBackend, Notifier};
use super::coordinator::Coordinator;
use super::sink::RodioBackend;
use super::types::{AudioCmd, AudioEvent, PlaybackHandle};

const TICK: Duration = Duration::from_millis(200);

/// Everything the audio thread needs to build its backend.
#[derive(Debug, Clone)]
pub struct AudioThreadConfig {
    pub demo_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub repeat: bool,
}

/// Spawn the audio thread. The output device is opened on the thread itself;
/// this call blocks until that either worked or failed.
pub(super) fn spawn_audio_thread<N>(
    rx: Receiver<AudioCmd>,
    events: Sender<AudioEvent>,
    playback_info: PlaybackHandle,
    notifier: N,
    config: AudioThreadConfig,
) -> Result<JoinHandle<()>, PlaybackError>
where
    N: Notifier + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), PlaybackError>>(1);

    let join = thread::Builder::new()
        .name("audio".into())
        .spawn(move || {
            let backend = match RodioBackend::open_default(config.demo_dir, config.fetch_timeout) {
                Ok(b) => {
                    let _ = ready_tx.send(Ok(()));
                    b
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let coordinator = Coordinator::new(backend, notifier, playback_info, config.repeat);
            run_loop(coordinator, rx, events);
        })
        .map_err(|e| PlaybackError::NoOutputDevice(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(join),
        Ok(Err(e)) => {
            let _ = join.join();
            Err(e)
        }
        Err(_) => Err(PlaybackError::NoOutputDevice(
            "audio thread exited during start-up".into(),
        )),
    }
}

/// Drive `coordinator` from `rx` until `Quit` arrives or every sender is gone.
pub(super) fn run_loop<B, N>(
    mut coordinator: Coordinator<B, N>,
    rx: Receiver<AudioCmd>,
    events: Sender<AudioEvent>,
) where
    B: MediaBackend,
    N: Notifier,
{
    loop {
        match rx.recv_timeout(TICK) {
            Ok(AudioCmd::Quit { fade_out_ms }) => {
                coordinator.shutdown(Duration::from_millis(fade_out_ms));
                break;
            }
            Ok(cmd) => {
                debug!(?cmd, "audio command");
                let title = match &cmd {
                    AudioCmd::Play(track) => Some(track.title.clone()),
                    _ => coordinator.current().map(|t| t.title.clone()),
                };
                if let Err(e) = apply(&mut coordinator, cmd) {
                    warn!(error = %e, "playback command failed");
                    let _ = events.send(AudioEvent::PlaybackFailed {
                        title: title.unwrap_or_default(),
                        message: e.to_string(),
                    });
                }
            }
            Err(RecvTimeoutError::Timeout) => coordinator.tick(),
            Err(RecvTimeoutError::Disconnected) => {
                coordinator.shutdown(Duration::ZERO);
                break;
            }
        }
    }
}

/// Apply one command. `Quit` is handled by the loop.
pub(super) fn apply<B, N>(
    coordinator: &mut Coordinator<B, N>,
    cmd: AudioCmd,
) -> Result<(), PlaybackError>
where
    B: MediaBackend,
    N: Notifier,
{
    match cmd {
        AudioCmd::Play(track) => coordinator.play(track)?,
        AudioCmd::Pause => coordinator.pause(),
        AudioCmd::Resume => coordinator.resume(),
        AudioCmd::TogglePause => coordinator.toggle_pause(),
        AudioCmd::SeekTo(to) => coordinator.seek(to)?,
        AudioCmd::Rewind(step) => coordinator.rewind(step)?,
        AudioCmd::Forward(step) => coordinator.forward(step)?,
        AudioCmd::ToggleRepeat => coordinator.toggle_repeat(),
        AudioCmd::SetRepeat(on) => coordinator.set_repeat(on),
        AudioCmd::Dismiss => coordinator.dismiss(),
        AudioCmd::Quit { fade_out_ms } => {
            coordinator.shutdown(Duration::from_millis(fade_out_ms))
        }
    }
    Ok(())
}
