//! Track descriptors and their source locators.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Placeholder some taggers and indexers write instead of an empty artist.
pub const UNKNOWN_ARTIST_PLACEHOLDER: &str = "<unknown>";

/// Stable identity of a track. Always non-negative so it can be embedded in
/// D-Bus object paths.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(i64);

impl TrackId {
    /// Wrap a raw id. Returns `None` for zero or negative values, which the
    /// catalog treats as "no identity".
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Derive a stable id from a file path (first 63 bits of its SHA-256).
    pub fn from_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let raw = (u64::from_be_bytes(bytes) & (i64::MAX as u64)) as i64;
        // Zero is reserved for "missing"; the odds are negligible but keep the invariant.
        Self(raw.max(1))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the audio for a track comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A file found by the library scan.
    File(PathBuf),
    /// A file shipped with the demo set, resolved against the demo directory.
    Bundled(String),
    /// An `http(s)` URL, e.g. a search preview.
    Remote(String),
}

impl Locator {
    const FILE_SCHEME: &'static str = "file://";
    const BUNDLED_SCHEME: &'static str = "bundled://";

    /// Parse the URI form stored on disk. Bare paths are accepted as files.
    pub fn parse(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return None;
        }
        if let Some(rest) = uri.strip_prefix(Self::FILE_SCHEME) {
            return Some(Self::File(PathBuf::from(rest)));
        }
        if let Some(rest) = uri.strip_prefix(Self::BUNDLED_SCHEME) {
            return (!rest.is_empty()).then(|| Self::Bundled(rest.to_string()));
        }
        let lower = uri.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(Self::Remote(uri.to_string()));
        }
        if uri.starts_with('/') {
            return Some(Self::File(PathBuf::from(uri)));
        }
        None
    }

    pub fn to_uri(&self) -> String {
        match self {
            Self::File(p) => format!("{}{}", Self::FILE_SCHEME, p.display()),
            Self::Bundled(name) => format!("{}{}", Self::BUNDLED_SCHEME, name),
            Self::Remote(url) => url.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// Immutable description of one playable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub locator: Locator,
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(
        id: TrackId,
        title: impl Into<String>,
        artist: Option<&str>,
        locator: Locator,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            artist: normalize_artist(artist),
            locator,
            duration,
        }
    }

    /// `"Artist - Title"`, or just the title when the artist is unknown.
    pub fn display(&self) -> String {
        match self.artist.as_deref() {
            Some(a) => format!("{} - {}", a, self.title),
            None => self.title.clone(),
        }
    }

    pub fn artist_or_unknown(&self) -> &str {
        self.artist.as_deref().unwrap_or("Unknown artist")
    }
}

/// Trim an artist name and map blanks and the `<unknown>` placeholder to `None`.
pub fn normalize_artist(artist: Option<&str>) -> Option<String> {
    artist
        .map(str::trim)
        .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case(UNKNOWN_ARTIST_PLACEHOLDER))
        .map(str::to_string)
}
