use std::time::Duration;

use ratatui::{Terminal, backend::TestBackend};

use super::*;
use crate::audio::PlaybackInfo;
use crate::config::Settings;
use crate::library::{AdjustmentStore, Catalog, Locator, TrackId};

fn track(id: i64, title: &str, artist: Option<&str>) -> Track {
    Track::new(
        TrackId::new(id).unwrap(),
        title,
        artist,
        Locator::Bundled(format!("{id}.mp3")),
        Some(Duration::from_secs(185)),
    )
}

fn render(app: &App) -> String {
    let settings = Settings::default();
    let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
    let display = app.display_indices();
    terminal
        .draw(|f| draw(f, app, &display, &settings.ui, &settings.controls))
        .unwrap();
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

fn app_with(tracks: Vec<Track>) -> App {
    App::new(Catalog::new(tracks, AdjustmentStore::in_memory()))
}

#[test]
fn time_formatting() {
    assert_eq!(format_mmss(Duration::from_secs(65)), "01:05");
    assert_eq!(format_duration_ceil(Some(Duration::from_millis(61_200))), "1:02");
    assert_eq!(format_duration_ceil(None), "-");
    assert_eq!(
        progress_text(Duration::from_secs(3), Duration::from_secs(60)),
        "00:03 / 01:00"
    );
    assert_eq!(progress_text(Duration::from_secs(3), Duration::ZERO), "00:03");
    assert_eq!(progress_ratio(Duration::from_secs(90), Duration::from_secs(60)), 1.0);
    assert_eq!(progress_ratio(Duration::from_secs(1), Duration::ZERO), 0.0);
}

#[test]
fn visible_window_centres_the_selection() {
    assert_eq!(visible_window(5, 10, 3), (0, 5, 3));
    assert_eq!(visible_window(100, 10, 50), (45, 55, 5));
    assert_eq!(visible_window(100, 10, 98), (90, 100, 8));
    assert_eq!(visible_window(100, 0, 7), (0, 100, 7));
}

#[test]
fn highlight_uppercases_matched_chars() {
    assert_eq!(highlight_matches("hello", vec![0, 4]), "HellO");
}

#[test]
fn controls_text_mentions_skip_step() {
    let text = controls_text(10);
    assert!(text.contains("[H/L] -/+10s"));
    assert!(text.contains("[dd] delete"));
    assert!(text.starts_with("[j/k]"));
}

#[test]
fn library_view_lists_tracks_and_status() {
    let a = track(1, "Alpha", Some("Band"));
    let mut app = app_with(vec![a.clone(), track(2, "Beta", None)]);
    app.sync_playback(PlaybackInfo {
        current: Some(a),
        playing: true,
        position: Duration::from_secs(3),
        duration: Duration::from_secs(185),
        repeat: true,
    });

    let screen = render(&app);
    assert!(screen.contains("Band - Alpha"));
    assert!(screen.contains("Beta"));
    assert!(screen.contains("Playing"));
    assert!(screen.contains("00:03 / 03:05"));
    assert!(screen.contains("Repeat: ON"));
}

#[test]
fn detail_view_shows_unknown_artist_and_source() {
    let mut app = app_with(vec![track(7, "Lonely", None)]);
    app.open_detail();

    let screen = render(&app);
    assert!(screen.contains("Unknown artist"));
    assert!(screen.contains("bundled://7.mp3"));
    assert!(screen.contains("not playing"));
}

#[test]
fn search_dialog_and_toast_render_over_the_list() {
    let mut app = app_with(vec![track(1, "Alpha", None)]);
    app.open_search();
    if let Some(dialog) = app.search.as_mut() {
        dialog.query = "daft".into();
        dialog.generation = 1;
        dialog.results = vec![track(99, "Around", Some("Robots"))];
        dialog.editing = false;
    }
    app.notify("Deleted");

    let screen = render(&app);
    assert!(screen.contains("daft"));
    assert!(screen.contains("1 result(s)"));
    assert!(screen.contains("Around - Robots"));
    assert!(screen.contains("Deleted"));
}
