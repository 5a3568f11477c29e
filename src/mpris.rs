//! MPRIS service: the desktop's "now playing" surface and media-key source.
//!
//! The coordinator publishes through [`MprisHandle`] (it implements
//! [`Notifier`]); remote control requests come back as [`ControlCmd`]s.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::audio::{Notifier, NowPlaying};

pub const BUS_NAME: &str = "org.mpris.MediaPlayer2.reprise";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const NOTIFY_POLL: Duration = Duration::from_millis(250);

/// Requests coming from MPRIS clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    /// Relative seek in microseconds; negative goes back.
    Seek(i64),
    SetPosition(Duration),
    SetRepeat(bool),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Status {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default)]
struct SharedState {
    status: Status,
    repeat: bool,
    title: Option<String>,
    artist: Vec<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    track_id: Option<OwnedObjectPath>,
}

fn track_object_path(id: i64) -> Option<OwnedObjectPath> {
    OwnedObjectPath::try_from(format!("{OBJECT_PATH}/track/{id}")).ok()
}

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

/// Cheap to clone; every clone feeds the same service.
#[derive(Clone)]
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    /// Refresh the reported position without announcing a change; clients
    /// poll it.
    pub fn set_position(&self, position: Duration) {
        if let Ok(mut s) = self.state.lock() {
            if s.status != Status::Stopped {
                s.position_micros = micros(position);
            }
        }
    }

    fn changed(&self) {
        let _ = self.notify.send(());
    }
}

impl Notifier for MprisHandle {
    fn publish(&self, notice: &NowPlaying) {
        if let Ok(mut s) = self.state.lock() {
            let track = &notice.track;
            s.status = if notice.ongoing {
                Status::Playing
            } else {
                Status::Paused
            };
            s.repeat = notice.repeat;
            s.title = Some(track.title.clone());
            s.artist = track.artist.iter().cloned().collect();
            s.url = Some(track.locator.to_uri());
            s.length_micros = if notice.duration.is_zero() {
                track.duration.map(micros)
            } else {
                Some(micros(notice.duration))
            };
            s.position_micros = micros(notice.position);
            s.track_id = track_object_path(track.id.get());
        }
        self.changed();
    }

    fn clear(&self) {
        if let Ok(mut s) = self.state.lock() {
            let repeat = s.repeat;
            *s = SharedState {
                repeat,
                ..SharedState::default()
            };
        }
        self.changed();
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Nothing to raise in a terminal.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "reprise"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".into(), "http".into(), "https".into()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        // Single-track sessions: nothing to skip to.
    }

    fn previous(&self) {}

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        let current = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.track_id.clone());
        let matches = current.is_some_and(|id| id.as_str() == track_id.as_str());
        if !matches || position < 0 {
            debug!(track_id = %track_id, position, "ignoring SetPosition");
            return;
        }
        let _ = self
            .tx
            .send(ControlCmd::SetPosition(Duration::from_micros(position as u64)));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.status {
            Status::Stopped => "Stopped",
            Status::Playing => "Playing",
            Status::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn loop_status(&self) -> &str {
        match self.state.lock() {
            Ok(s) if s.repeat => "Track",
            _ => "None",
        }
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        let _ = self.tx.send(ControlCmd::SetRepeat(value != "None"));
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map_or(0, |s| s.position_micros)
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.state
            .lock()
            .is_ok_and(|s| s.status != Status::Stopped)
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut put = |key: &str, value: Value<'_>| {
            if let Ok(v) = OwnedValue::try_from(value) {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(id) = &s.track_id {
            put("mpris:trackid", Value::from(id.clone().into_inner()));
        }
        if let Some(title) = &s.title {
            put("xesam:title", Value::from(title.clone()));
        }
        if !s.artist.is_empty() {
            put("xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(url) = &s.url {
            put("xesam:url", Value::from(url.clone()));
        }
        if let Some(len) = s.length_micros {
            put("mpris:length", Value::from(len));
        }
        map
    }
}

/// Announce property changes for everything clients watch.
async fn emit_changes(connection: &Connection) -> zbus::Result<()> {
    let iface_ref = connection
        .object_server()
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    let iface = iface_ref.get().await;
    let emitter = iface_ref.signal_emitter();
    iface.playback_status_changed(emitter).await?;
    iface.metadata_changed(emitter).await?;
    iface.loop_status_changed(emitter).await?;
    iface.can_seek_changed(emitter).await?;
    Ok(())
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify_rx: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    debug!(name = BUS_NAME, "MPRIS service registered");

    loop {
        Timer::after(NOTIFY_POLL).await;
        let mut pending = false;
        loop {
            match notify_rx.try_recv() {
                Ok(()) => pending = true,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if pending {
            if let Err(e) = emit_changes(&connection).await {
                debug!(error = %e, "failed to emit PropertiesChanged");
            }
        }
    }
}

/// Start the MPRIS service on its own thread. A missing session bus only
/// disables the integration; the handle keeps working.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".into())
        .spawn(move || {
            if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
                warn!(error = %e, "MPRIS unavailable");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn MPRIS thread");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

#[cfg(test)]
mod tests;
