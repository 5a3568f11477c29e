use std::fs;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use super::{DownloadEvent, Downloader, file_name_for, part_path, store_body, url_extension};
use crate::error::DownloadError;
use crate::library::{Locator, Track, TrackId};

fn remote(title: &str, artist: Option<&str>, url: &str) -> Track {
    Track::new(
        TrackId::new(5).unwrap(),
        title,
        artist,
        Locator::Remote(url.into()),
        None,
    )
}

#[test]
fn url_extension_ignores_query_and_odd_suffixes() {
    assert_eq!(url_extension("https://a.example/p/x.m4a?token=1"), Some("m4a"));
    assert_eq!(url_extension("https://a.example/p/x.MP3#t=3"), Some("MP3"));
    assert_eq!(url_extension("https://a.example/p/stream"), None);
    assert_eq!(url_extension("https://a.example/p/x.not-an-ext"), None);
}

#[test]
fn file_name_joins_title_and_artist_and_strips_slashes() {
    let t = remote("AC/DC Live", Some("Band/Crew"), "https://a.example/1.m4a");
    assert_eq!(
        file_name_for(&t, "https://a.example/1.m4a"),
        "AC-DC Live - Band-Crew.m4a"
    );

    let t = remote("Song", None, "https://a.example/stream");
    assert_eq!(
        file_name_for(&t, "https://a.example/stream"),
        "Song - Unknown artist.mp3"
    );
}

#[test]
fn only_remote_tracks_can_be_downloaded() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel();
    let mut downloader = Downloader::new(dir.path().to_path_buf(), tx).unwrap();

    let local = Track::new(
        TrackId::new(1).unwrap(),
        "Local",
        None,
        Locator::File(PathBuf::from("/music/local.mp3")),
        None,
    );
    assert!(matches!(downloader.start(&local), Err(DownloadError::NotRemote)));
    assert_eq!(downloader.pending(), 0);
}

#[test]
fn completion_is_resolved_to_the_started_title() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let mut downloader = Downloader::new(dir.path().to_path_buf(), tx).unwrap();

    // nothing listens on the discard port, so this fails fast
    let track = remote("Nowhere", Some("Band"), "http://127.0.0.1:9/x.m4a");
    let first = downloader.start(&track).unwrap();
    assert_eq!(first, 1);
    assert_eq!(downloader.pending(), 1);

    let event = rx.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(event.id, first);
    let finished = downloader.finish(event).unwrap();
    assert_eq!(finished.title, "Nowhere");
    assert!(finished.result.is_err());
    assert_eq!(downloader.pending(), 0);
    assert!(!dir.path().join("Nowhere - Band.m4a").exists());

    // a second completion for the same id is not reported twice
    let stale = DownloadEvent {
        id: first,
        result: Ok(dir.path().join("x")),
    };
    assert!(downloader.finish(stale).is_none());
}

/// Yields a few bytes, then fails like a dropped connection.
struct DroppedConnection {
    sent: bool,
}

impl Read for DroppedConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        }
        self.sent = true;
        let n = buf.len().min(4);
        buf[..n].copy_from_slice(&b"ID3\x04"[..n]);
        Ok(n)
    }
}

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn temp_names_differ_per_download() {
    let dest = PathBuf::from("/music/Song - Band.m4a");
    assert_eq!(part_path(&dest, 1), PathBuf::from("/music/Song - Band.m4a.1.part"));
    assert_ne!(part_path(&dest, 1), part_path(&dest, 2));
}

#[test]
fn finished_body_is_moved_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("Song - Band.mp3");

    let mut body = Cursor::new(b"audio".to_vec());
    let stored = store_body(&mut body, &part_path(&dest, 1), &dest).unwrap();
    assert_eq!(stored, dest);
    assert_eq!(fs::read(&dest).unwrap(), b"audio");
    assert_eq!(entries(dir.path()), vec!["Song - Band.mp3".to_string()]);
}

#[test]
fn interrupted_body_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("Song - Band.mp3");

    let mut body = DroppedConnection { sent: false };
    let err = store_body(&mut body, &part_path(&dest, 3), &dest);
    assert!(matches!(err, Err(DownloadError::Io { .. })));
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn failed_rename_removes_the_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    // a non-empty directory squatting on the final name makes the rename fail
    let dest = dir.path().join("Song - Band.mp3");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("keep"), b"x").unwrap();

    let mut body = Cursor::new(b"audio".to_vec());
    let err = store_body(&mut body, &part_path(&dest, 4), &dest);
    assert!(matches!(err, Err(DownloadError::Io { .. })));
    assert_eq!(entries(dir.path()), vec!["Song - Band.mp3".to_string()]);
    assert!(dest.join("keep").exists());
}
