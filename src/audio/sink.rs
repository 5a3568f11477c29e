//! The rodio-backed media player.
//!
//! Local and bundled tracks are decoded straight from disk. Remote tracks are
//! fetched in full and decoded from memory, so seeking works the same way for
//! every locator.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lofty::file::AudioFile;
use lofty::probe::Probe;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::PlaybackError;
use crate::library::{Locator, Track};

use super::backend::{MediaBackend, PlayerHandle};

/// Where the decoder reads from. Kept so a looping or finished handle can be
/// re-appended without touching the network again.
#[derive(Clone)]
enum SourceData {
    File(PathBuf),
    Memory { url: String, bytes: Arc<[u8]> },
}

impl SourceData {
    fn describe(&self) -> String {
        match self {
            SourceData::File(path) => path.display().to_string(),
            SourceData::Memory { url, .. } => url.clone(),
        }
    }

    /// Length from the container headers, for streams the decoder cannot
    /// measure (CBR MP3 without a Xing frame, for one).
    fn probe_length(&self) -> Option<Duration> {
        match self {
            SourceData::File(path) => probe_length(path),
            SourceData::Memory { bytes, .. } => Probe::new(Cursor::new(bytes.clone()))
                .guess_file_type()
                .ok()?
                .read()
                .ok()
                .map(|tagged| tagged.properties().duration())
                .filter(|d| !d.is_zero()),
        }
    }

    /// Decode and append to `sink`, returning the length the decoder reports.
    fn append_to(&self, sink: &Sink) -> Result<Option<Duration>, PlaybackError> {
        let decode_err = |e: rodio::decoder::DecoderError| PlaybackError::Decode {
            locator: self.describe(),
            message: e.to_string(),
        };
        match self {
            SourceData::File(path) => {
                let file = File::open(path).map_err(|source| PlaybackError::Open {
                    path: path.clone(),
                    source,
                })?;
                let decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;
                let total = decoder.total_duration();
                sink.append(decoder);
                Ok(total)
            }
            SourceData::Memory { bytes, .. } => {
                let decoder = Decoder::new(Cursor::new(bytes.clone())).map_err(decode_err)?;
                let total = decoder.total_duration();
                sink.append(decoder);
                Ok(total)
            }
        }
    }
}

pub struct RodioBackend {
    // Dropping the stream silences every sink connected to it.
    stream: OutputStream,
    demo_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn open_default(demo_dir: PathBuf, fetch_timeout: Duration) -> Result<Self, PlaybackError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::NoOutputDevice(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which garbles the TUI.
        stream.log_on_drop(false);

        let client = reqwest::blocking::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| PlaybackError::Fetch {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            stream,
            demo_dir,
            client,
        })
    }

    fn resolve(&self, locator: &Locator) -> Result<SourceData, PlaybackError> {
        match locator {
            Locator::File(path) => Ok(SourceData::File(path.clone())),
            Locator::Bundled(name) => bundled_path(&self.demo_dir, name).map(SourceData::File),
            Locator::Remote(url) => {
                let bytes = self.fetch(url)?;
                Ok(SourceData::Memory {
                    url: url.clone(),
                    bytes,
                })
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<Arc<[u8]>, PlaybackError> {
        let fetch_err = |message: String| PlaybackError::Fetch {
            url: url.to_string(),
            message,
        };
        debug!(url, "fetching remote track");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", resp.status().as_u16())));
        }
        let bytes = resp.bytes().map_err(|e| fetch_err(e.to_string()))?;
        Ok(Arc::from(bytes.as_ref()))
    }
}

/// Resolve a bundled asset name inside the demo directory. Names that would
/// escape it are rejected.
pub(super) fn bundled_path(demo_dir: &Path, name: &str) -> Result<PathBuf, PlaybackError> {
    let escapes = Path::new(name)
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(PlaybackError::UnsupportedLocator(format!("bundled://{name}")));
    }
    Ok(demo_dir.join(name))
}

/// Length of the file at `path` as its tags and headers report it.
pub(super) fn probe_length(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
        .filter(|d| !d.is_zero())
}

/// Pick the track length: the decoder's, then the catalog's, then whatever
/// `probe` finds. Zero when nobody knows.
pub(super) fn resolve_length(
    decoded: Option<Duration>,
    known: Option<Duration>,
    probe: impl FnOnce() -> Option<Duration>,
) -> Duration {
    decoded
        .filter(|d| !d.is_zero())
        .or(known)
        .or_else(probe)
        .unwrap_or(Duration::ZERO)
}

impl MediaBackend for RodioBackend {
    type Handle = RodioHandle;

    fn open(&mut self, track: &Track) -> Result<RodioHandle, PlaybackError> {
        let data = self.resolve(&track.locator)?;
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        let total = data.append_to(&sink)?;
        let duration = resolve_length(total, track.duration, || data.probe_length());
        if duration.is_zero() {
            debug!(locator = %track.locator, "track length unknown");
        }
        Ok(RodioHandle {
            sink,
            data,
            duration,
            looping: false,
            completed: false,
        })
    }
}

pub struct RodioHandle {
    sink: Sink,
    data: SourceData,
    duration: Duration,
    looping: bool,
    completed: bool,
}

impl RodioHandle {
    fn reappend(&mut self) -> bool {
        match self.data.append_to(&self.sink) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "could not re-append source");
                false
            }
        }
    }
}

impl PlayerHandle for RodioHandle {
    fn start(&mut self) {
        if self.sink.empty() {
            // Starting a finished track plays it again from the top.
            self.reappend();
        }
        self.completed = false;
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn position(&self) -> Duration {
        if self.sink.empty() {
            return if self.completed {
                self.duration
            } else {
                Duration::ZERO
            };
        }
        let pos = self.sink.get_pos();
        if self.duration.is_zero() {
            pos
        } else {
            pos.min(self.duration)
        }
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn seek(&mut self, to: Duration) -> Result<(), PlaybackError> {
        if self.sink.empty() {
            if !self.reappend() {
                return Ok(());
            }
            self.completed = false;
        }
        self.sink
            .try_seek(to)
            .map_err(|e| PlaybackError::Seek(e.to_string()))
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }

    fn poll_completed(&mut self) -> bool {
        if self.sink.is_paused() || !self.sink.empty() || self.completed {
            return false;
        }
        if self.looping && self.reappend() {
            return false;
        }
        self.completed = true;
        true
    }

    fn release(&mut self) {
        self.sink.stop();
    }
}
