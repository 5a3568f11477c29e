use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::{Accessor, ItemKey, Tag};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{Locator, Track, TrackId, normalize_artist};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Keep the indexed artist unless it is blank or a placeholder, in which case
/// the first usable embedded value wins.
pub(super) fn refine_artist<I>(indexed: Option<&str>, embedded: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    normalize_artist(indexed).or_else(|| {
        embedded
            .into_iter()
            .find_map(|candidate| normalize_artist(candidate.as_deref()))
    })
}

fn tag_string(tag: &Tag, key: ItemKey) -> Option<String> {
    tag.get_string(key).map(str::to_string)
}

/// Scan every directory in `dirs` and return the audio files found, sorted
/// case-insensitively by their display string. Unreadable directories are
/// logged and skipped.
pub fn scan_dirs<P: AsRef<Path>>(dirs: &[P], settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "music directory missing, skipping");
            continue;
        }
        tracks.extend(scan(dir, settings));
    }
    tracks.sort_by(|a, b| a.display().to_lowercase().cmp(&b.display().to_lowercase()));
    tracks
}

pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !(path.is_file() && is_audio_file(path, settings)) {
            continue;
        }

        let mut title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let mut artist: Option<String> = None;
        let mut duration: Option<Duration> = None;

        match lofty::read_from_path(path) {
            Ok(tagged) => {
                let props_duration = tagged.properties().duration();
                if !props_duration.is_zero() {
                    duration = Some(props_duration);
                }

                let primary = tagged.primary_tag().or_else(|| tagged.first_tag());
                if let Some(tag) = primary {
                    if let Some(v) = tag.title() {
                        if !v.trim().is_empty() {
                            title = v.trim().to_string();
                        }
                    }
                }

                let indexed = primary.and_then(|t| tag_string(t, ItemKey::TrackArtist));
                let embedded = tagged.tags().iter().flat_map(|t| {
                    [
                        tag_string(t, ItemKey::TrackArtist),
                        tag_string(t, ItemKey::AlbumArtist),
                    ]
                });
                artist = refine_artist(indexed.as_deref(), embedded);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable tags");
            }
        }

        tracks.push(Track::new(
            TrackId::from_path(path),
            title,
            artist.as_deref(),
            Locator::File(path.to_path_buf()),
            duration,
        ));
    }

    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.m4a"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));
    }

    #[test]
    fn refine_artist_keeps_indexed_value_when_usable() {
        let embedded = vec![Some("Tagged".to_string())];
        assert_eq!(
            refine_artist(Some("Indexed"), embedded),
            Some("Indexed".to_string())
        );
    }

    #[test]
    fn refine_artist_replaces_blank_and_placeholder() {
        let embedded = || vec![None, Some("  ".to_string()), Some("Album Artist".to_string())];
        assert_eq!(
            refine_artist(Some("<UNKNOWN>"), embedded()),
            Some("Album Artist".to_string())
        );
        assert_eq!(
            refine_artist(Some("   "), embedded()),
            Some("Album Artist".to_string())
        );
        assert_eq!(refine_artist(None, embedded()), Some("Album Artist".to_string()));
        assert_eq!(refine_artist(None, Vec::<Option<String>>::new()), None);
    }

    #[test]
    fn scan_filters_non_audio_and_derives_stable_ids() {
        let dir = tempdir().unwrap();

        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("A.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();

        let settings = LibrarySettings::default();
        let tracks = scan_dirs(&[dir.path()], &settings);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "A");
        assert_eq!(tracks[1].title, "b");
        assert_eq!(tracks[0].artist, None);
        assert_eq!(
            tracks[0].locator,
            Locator::File(dir.path().join("A.ogg"))
        );

        let again = scan_dirs(&[dir.path()], &settings);
        assert_eq!(tracks[0].id, again[0].id);
        assert_ne!(tracks[0].id, tracks[1].id);
    }

    #[test]
    fn scan_dirs_skips_missing_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("song.mp3"), b"not real").unwrap();
        let missing = dir.path().join("nope");

        let tracks = scan_dirs(&[missing.as_path(), dir.path()], &LibrarySettings::default());
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn scan_respects_include_hidden_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            include_hidden: false,
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "visible");
    }

    #[test]
    fn scan_respects_recursive_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("child.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            recursive: false,
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "root");
    }

    #[test]
    fn scan_respects_max_depth() {
        let dir = tempdir().unwrap();
        let d1 = dir.path().join("d1");
        let d2 = d1.join("d2");
        fs::create_dir_all(&d2).unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        fs::write(d1.join("one.mp3"), b"not real").unwrap();
        fs::write(d2.join("two.mp3"), b"not real").unwrap();

        // root is depth 0, so max_depth=2 reaches d1/* but not d1/d2/*.
        let settings = LibrarySettings {
            max_depth: Some(2),
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);

        let names: Vec<String> = tracks.iter().map(|t| t.title.clone()).collect();
        assert!(names.contains(&"root".to_string()));
        assert!(names.contains(&"one".to_string()));
        assert!(!names.contains(&"two".to_string()));
    }
}
