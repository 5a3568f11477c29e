use std::path::{Path, PathBuf};
use std::time::Duration;

use super::catalog::{Catalog, demo_source, demo_tracks, merge_catalog};
use super::model::{Locator, Track, TrackId};
use super::store::{AddedTrackRecord, AdjustmentStore, LibraryAdjustments};

fn id(raw: i64) -> TrackId {
    TrackId::new(raw).unwrap()
}

fn local(raw: i64, title: &str) -> Track {
    Track::new(
        id(raw),
        title,
        Some("Local Artist"),
        Locator::File(PathBuf::from(format!("/music/{title}.mp3"))),
        Some(Duration::from_secs(200)),
    )
}

fn remote(raw: i64, title: &str) -> Track {
    Track::new(
        id(raw),
        title,
        Some("Remote Artist"),
        Locator::Remote(format!("https://audio.example/{raw}.m4a")),
        Some(Duration::from_millis(30_000)),
    )
}

fn store_in(dir: &Path) -> AdjustmentStore {
    AdjustmentStore::new(dir.join("library.json"))
}

#[test]
fn track_id_rejects_non_positive_and_hashes_paths_stably() {
    assert!(TrackId::new(0).is_none());
    assert!(TrackId::new(-4).is_none());
    assert_eq!(TrackId::new(7).unwrap().get(), 7);

    let a = TrackId::from_path(Path::new("/music/a.mp3"));
    let b = TrackId::from_path(Path::new("/music/b.mp3"));
    assert_eq!(a, TrackId::from_path(Path::new("/music/a.mp3")));
    assert_ne!(a, b);
    assert!(a.get() > 0);
}

#[test]
fn locator_parses_every_supported_form() {
    assert_eq!(
        Locator::parse("file:///music/a.mp3"),
        Some(Locator::File(PathBuf::from("/music/a.mp3")))
    );
    assert_eq!(
        Locator::parse("/music/a.mp3"),
        Some(Locator::File(PathBuf::from("/music/a.mp3")))
    );
    assert_eq!(
        Locator::parse("bundled://song1.mp3"),
        Some(Locator::Bundled("song1.mp3".into()))
    );
    assert_eq!(
        Locator::parse("HTTPS://audio.example/x.m4a"),
        Some(Locator::Remote("HTTPS://audio.example/x.m4a".into()))
    );
    assert_eq!(Locator::parse(""), None);
    assert_eq!(Locator::parse("bundled://"), None);
    assert_eq!(Locator::parse("content://media/42"), None);

    let l = Locator::File(PathBuf::from("/music/a.mp3"));
    assert_eq!(Locator::parse(&l.to_uri()), Some(l));
}

#[test]
fn track_normalizes_placeholder_artists() {
    let t = Track::new(id(1), "Song", Some("<unknown>"), Locator::Bundled("x".into()), None);
    assert_eq!(t.artist, None);
    assert_eq!(t.display(), "Song");
    assert_eq!(t.artist_or_unknown(), "Unknown artist");

    let t = Track::new(id(1), "Song", Some("  Band "), Locator::Bundled("x".into()), None);
    assert_eq!(t.display(), "Band - Song");
}

#[test]
fn demo_set_has_five_bundled_tracks() {
    let demo = demo_tracks();
    assert_eq!(demo.len(), 5);
    assert_eq!(demo[0].id.get(), 1001);
    assert_eq!(demo[4].id.get(), 1005);
    assert_eq!(demo[2].title, "Demo Song 3");
    assert_eq!(demo[2].locator, Locator::Bundled("song3.mp3".into()));
    assert!(demo.iter().all(|t| t.artist.as_deref() == Some("SoundHelix")));
}

#[test]
fn merge_keeps_one_descriptor_per_id() {
    let demo = demo_tracks();
    let indexed = vec![local(1001, "Clash"), local(42, "Answer"), local(42, "Again")];
    let mut adjustments = LibraryAdjustments::default();
    adjustments.upsert_added(&remote(42, "Also 42"));
    adjustments.upsert_added(&remote(77, "New"));

    let merged = merge_catalog([demo, indexed], &adjustments);

    let mut ids: Vec<i64> = merged.iter().map(|t| t.id.get()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);

    // first occurrence wins: demo over index, index over persisted
    let t1001 = merged.iter().find(|t| t.id.get() == 1001).unwrap();
    assert_eq!(t1001.title, "Demo Song 1");
    let t42 = merged.iter().find(|t| t.id.get() == 42).unwrap();
    assert_eq!(t42.title, "Answer");
    assert!(merged.iter().any(|t| t.id.get() == 77));
    assert_eq!(merged.len(), 5 + 1 + 1);
}

#[test]
fn merge_drops_deleted_ids_from_every_source() {
    let mut adjustments = LibraryAdjustments::default();
    adjustments.deleted_ids.insert(id(1002));
    adjustments.deleted_ids.insert(id(42));
    adjustments.deleted_ids.insert(id(77));
    adjustments.upsert_added(&remote(77, "Gone"));

    let merged = merge_catalog([demo_tracks(), vec![local(42, "Answer")]], &adjustments);

    assert!(merged.iter().all(|t| !adjustments.is_deleted(t.id)));
    assert_eq!(merged.len(), 4);
}

#[test]
fn store_round_trips_the_two_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    assert_eq!(store.read().unwrap(), LibraryAdjustments::default());

    store.mark_deleted(id(5)).unwrap();
    store.persist_added(&remote(9, "Nine")).unwrap();

    let raw = std::fs::read_to_string(store.path().unwrap()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["deleted_ids"], serde_json::json!([5]));
    assert_eq!(json["added_songs"][0]["id"], 9);
    assert_eq!(json["added_songs"][0]["uri"], "https://audio.example/9.m4a");
    assert_eq!(json["added_songs"][0]["durationMs"], 30_000);

    let adj = store.read().unwrap();
    assert!(adj.is_deleted(id(5)));
    assert_eq!(adj.added_tracks(), vec![remote(9, "Nine")]);
}

#[test]
fn store_skips_records_without_id_or_uri() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(
        store.path().unwrap(),
        r#"{"added_songs":[
            {"id":0,"title":"No id","artist":"A","uri":"https://x/0.m4a"},
            {"id":3,"title":"No uri","artist":"A","uri":""},
            {"id":4,"uri":"https://x/4.m4a"}
        ]}"#,
    )
    .unwrap();

    let tracks = store.read().unwrap().added_tracks();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id.get(), 4);
    assert_eq!(tracks[0].title, "Unknown");
    assert_eq!(tracks[0].artist, None);
    assert_eq!(tracks[0].duration, None);
}

#[test]
fn unknown_artists_have_one_stored_form() {
    let anonymous = Track::new(
        id(8),
        "Eight",
        None,
        Locator::Remote("https://audio.example/8.m4a".into()),
        None,
    );
    let written = AddedTrackRecord::from_track(&anonymous);
    assert_eq!(written.artist, "");

    let missing: AddedTrackRecord =
        serde_json::from_str(r#"{"id":8,"title":"Eight","uri":"https://audio.example/8.m4a"}"#)
            .unwrap();
    assert_eq!(missing, written);
    assert_eq!(missing.to_track(), Some(anonymous));
}

#[test]
fn demo_tracks_need_a_directory() {
    assert_eq!(demo_source(true, Some(Path::new("/data/demo"))).len(), 5);
    assert!(demo_source(true, None).is_empty());
    assert!(demo_source(false, Some(Path::new("/data/demo"))).is_empty());
}

#[test]
fn store_load_falls_back_to_empty_on_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    std::fs::write(store.path().unwrap(), "{ not json").unwrap();

    assert!(store.read().is_err());
    assert_eq!(store.load(), LibraryAdjustments::default());
}

#[test]
fn adding_the_same_track_twice_persists_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let mut catalog = Catalog::new(demo_tracks(), store.clone());

    assert!(catalog.add_external(remote(9, "Nine")).unwrap());
    assert!(!catalog.add_external(remote(9, "Nine (remaster)")).unwrap());

    assert_eq!(catalog.tracks().iter().filter(|t| t.id.get() == 9).count(), 1);
    let adj = store.read().unwrap();
    assert_eq!(adj.added_songs.len(), 1);
    assert_eq!(adj.added_songs[0].title, "Nine (remaster)");
}

#[test]
fn deleting_removes_from_list_and_storage_and_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let mut catalog = Catalog::new(demo_tracks(), store.clone());
    catalog.add_external(remote(9, "Nine")).unwrap();

    let removed = catalog.delete(id(9)).unwrap();
    assert_eq!(removed.map(|t| t.title), Some("Nine".to_string()));
    assert!(!catalog.contains(id(9)));

    let removed_demo = catalog.delete(id(1003)).unwrap();
    assert!(removed_demo.is_some());

    let adj = store.read().unwrap();
    assert!(adj.added_songs.is_empty());
    assert!(adj.is_deleted(id(9)));
    assert!(adj.is_deleted(id(1003)));

    // a fresh load from the same sources never brings them back
    let reloaded = merge_catalog([demo_tracks(), vec![remote(9, "Nine")]], &adj);
    assert!(reloaded.iter().all(|t| t.id != id(9) && t.id != id(1003)));
    assert_eq!(reloaded.len(), 4);
}

#[test]
fn catalog_load_merges_demo_scan_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("music");
    std::fs::create_dir_all(&music).unwrap();
    std::fs::write(music.join("local.mp3"), b"not real").unwrap();

    let store = store_in(dir.path());
    store.persist_added(&remote(9, "Nine")).unwrap();
    store.mark_deleted(id(1001)).unwrap();

    let mut settings = crate::config::Settings::default();
    settings.library.music_dirs = vec![music.clone()];
    settings.library.demo_dir = Some(dir.path().join("demo"));

    let catalog = Catalog::load(&settings, store);
    assert_eq!(catalog.len(), 4 + 1 + 1);
    assert!(!catalog.contains(id(1001)));
    assert!(catalog.contains(id(9)));
    assert!(catalog.contains(TrackId::from_path(&music.join("local.mp3"))));
    assert_eq!(catalog.position_of(id(1002)), Some(0));
}
