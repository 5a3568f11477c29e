use super::*;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crate::library::{Locator, Track, TrackId};

fn make_track() -> Track {
    Track::new(
        TrackId::new(7).unwrap(),
        "Test Title",
        Some("Test Artist"),
        Locator::File(PathBuf::from("/tmp/music/test.mp3")),
        Some(Duration::from_micros(1_234_567)),
    )
}

fn now_playing(ongoing: bool) -> NowPlaying {
    NowPlaying {
        track: make_track(),
        ongoing,
        repeat: false,
        position: Duration::from_secs(2),
        duration: Duration::ZERO,
    }
}

fn handle_with_state() -> (MprisHandle, Arc<Mutex<SharedState>>, mpsc::Receiver<()>) {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();
    let handle = MprisHandle {
        state: state.clone(),
        notify: notify_tx,
    };
    (handle, state, notify_rx)
}

fn iface(state: &Arc<Mutex<SharedState>>) -> (PlayerIface, mpsc::Receiver<ControlCmd>) {
    let (tx, rx) = mpsc::channel::<ControlCmd>();
    (
        PlayerIface {
            tx,
            state: state.clone(),
        },
        rx,
    )
}

#[test]
fn publish_fills_shared_state_and_clear_resets_it() {
    let (handle, state, notify_rx) = handle_with_state();

    handle.publish(&now_playing(true));
    {
        let s = state.lock().unwrap();
        assert_eq!(s.status, Status::Playing);
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist, vec!["Test Artist".to_string()]);
        assert!(s.url.as_deref().unwrap().contains("/tmp/music/test.mp3"));
        // player reported no length, so the descriptor's is used
        assert_eq!(s.length_micros, Some(1_234_567));
        assert_eq!(s.position_micros, 2_000_000);
        assert_eq!(
            s.track_id.as_ref().map(|p| p.as_str()),
            Some("/org/mpris/MediaPlayer2/track/7")
        );
    }

    handle.clear();
    {
        let s = state.lock().unwrap();
        assert_eq!(s.status, Status::Stopped);
        assert_eq!(s.title, None);
        assert!(s.artist.is_empty());
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_id.is_none());
    }

    assert_eq!(notify_rx.try_iter().count(), 2);
}

#[test]
fn paused_notice_maps_to_paused_status() {
    let (handle, state, _rx) = handle_with_state();
    let (iface, _cmds) = iface(&state);

    assert_eq!(iface.playback_status(), "Stopped");
    handle.publish(&now_playing(true));
    assert_eq!(iface.playback_status(), "Playing");
    handle.publish(&now_playing(false));
    assert_eq!(iface.playback_status(), "Paused");
    handle.clear();
    assert_eq!(iface.playback_status(), "Stopped");
}

#[test]
fn position_updates_are_ignored_while_stopped() {
    let (handle, state, _rx) = handle_with_state();
    let (iface, _cmds) = iface(&state);

    handle.set_position(Duration::from_secs(9));
    assert_eq!(iface.position(), 0);

    handle.publish(&now_playing(true));
    handle.set_position(Duration::from_secs(9));
    assert_eq!(iface.position(), 9_000_000);
}

#[test]
fn loop_status_follows_repeat_and_setter_sends_command() {
    let (handle, state, _rx) = handle_with_state();
    let (mut iface, cmds) = iface(&state);

    assert_eq!(iface.loop_status(), "None");
    handle.publish(&NowPlaying {
        repeat: true,
        ..now_playing(true)
    });
    assert_eq!(iface.loop_status(), "Track");

    // repeat survives the session ending
    handle.clear();
    assert_eq!(iface.loop_status(), "Track");

    iface.set_loop_status("None".into());
    iface.set_loop_status("Playlist".into());
    let got: Vec<ControlCmd> = cmds.try_iter().collect();
    assert_eq!(
        got,
        vec![ControlCmd::SetRepeat(false), ControlCmd::SetRepeat(true)]
    );
}

#[test]
fn set_position_only_applies_to_the_current_track() {
    let (handle, state, _rx) = handle_with_state();
    let (iface, cmds) = iface(&state);
    handle.publish(&now_playing(true));

    let other = ObjectPath::try_from("/org/mpris/MediaPlayer2/track/8").unwrap();
    iface.set_position(other, 5_000_000);
    let current = ObjectPath::try_from("/org/mpris/MediaPlayer2/track/7").unwrap();
    iface.set_position(current.clone(), -1);
    iface.set_position(current, 5_000_000);
    iface.seek(-3_000_000);

    let got: Vec<ControlCmd> = cmds.try_iter().collect();
    assert_eq!(
        got,
        vec![
            ControlCmd::SetPosition(Duration::from_secs(5)),
            ControlCmd::Seek(-3_000_000),
        ]
    );
}

#[test]
fn metadata_includes_expected_keys_when_present() {
    let (handle, state, _rx) = handle_with_state();
    let (iface, _cmds) = iface(&state);

    assert!(iface.metadata().is_empty());

    handle.publish(&now_playing(true));
    let map = iface.metadata();
    for k in [
        "mpris:trackid",
        "xesam:title",
        "xesam:artist",
        "xesam:url",
        "mpris:length",
    ] {
        assert!(map.contains_key(k), "missing key: {k}");
    }
}
