//! Background downloads of remote tracks into the download directory.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{info, warn};

use crate::error::DownloadError;
use crate::library::{Locator, Track};

const FALLBACK_EXT: &str = "mp3";

/// Identifies one download for the lifetime of the process.
pub type DownloadId = u64;

/// Sent by a worker when its download is over.
#[derive(Debug)]
pub struct DownloadEvent {
    pub id: DownloadId,
    pub result: Result<PathBuf, DownloadError>,
}

/// A completion resolved against the pending table.
#[derive(Debug)]
pub struct Finished {
    pub title: String,
    pub result: Result<PathBuf, DownloadError>,
}

/// Extension of the last path segment of `url`, if it looks like one.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    let plausible = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    plausible.then_some(ext)
}

/// `"<title> - <artist>.<ext>"`, with path separators replaced.
pub fn file_name_for(track: &Track, url: &str) -> String {
    let stem = format!("{} - {}", track.title, track.artist_or_unknown()).replace('/', "-");
    let ext = url_extension(url).unwrap_or(FALLBACK_EXT).to_ascii_lowercase();
    format!("{stem}.{ext}")
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Temp name for download `id`. Distinct per download, so fetching the same
/// track twice never interleaves writes.
pub(crate) fn part_path(dest: &Path, id: DownloadId) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{id}.part"));
    dest.with_file_name(name)
}

fn write_part(body: &mut impl Read, part: &Path) -> Result<(), DownloadError> {
    let file = File::create(part).map_err(io_err(part))?;
    let mut writer = BufWriter::new(file);
    io::copy(body, &mut writer).map_err(io_err(part))?;
    writer.flush().map_err(io_err(part))
}

/// Write `body` to `part`, then move it to `dest`. On any failure `part` is
/// removed and `dest` is left untouched.
pub(crate) fn store_body(
    body: &mut impl Read,
    part: &Path,
    dest: &Path,
) -> Result<PathBuf, DownloadError> {
    let result =
        write_part(body, part).and_then(|()| fs::rename(part, dest).map_err(io_err(dest)));
    if result.is_err() {
        if let Err(e) = fs::remove_file(part) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %part.display(), error = %e, "could not remove partial download");
            }
        }
    }
    result.map(|()| dest.to_path_buf())
}

/// Stream `url` into `dest`. The file only appears under its final name once
/// the transfer completed.
fn fetch_to(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
    id: DownloadId,
) -> Result<PathBuf, DownloadError> {
    let mut resp = client.get(url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::Status(status.as_u16()));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    store_body(&mut resp, &part_path(dest, id), dest)
}

pub struct Downloader {
    client: reqwest::blocking::Client,
    dir: PathBuf,
    next_id: DownloadId,
    pending: HashMap<DownloadId, String>,
    tx: Sender<DownloadEvent>,
}

impl Downloader {
    pub fn new(dir: PathBuf, tx: Sender<DownloadEvent>) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            dir,
            next_id: 1,
            pending: HashMap::new(),
            tx,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Start downloading `track` in the background. Only remote tracks can
    /// be downloaded.
    pub fn start(&mut self, track: &Track) -> Result<DownloadId, DownloadError> {
        let Locator::Remote(url) = &track.locator else {
            return Err(DownloadError::NotRemote);
        };

        let id = self.next_id;
        self.next_id += 1;
        let dest = self.dir.join(file_name_for(track, url));
        let url = url.clone();
        let client = self.client.clone();
        let tx = self.tx.clone();

        thread::Builder::new()
            .name(format!("download-{id}"))
            .spawn(move || {
                let result = fetch_to(&client, &url, &dest, id);
                let _ = tx.send(DownloadEvent { id, result });
            })
            .map_err(io_err(&self.dir))?;

        info!(id, title = %track.title, "download started");
        self.pending.insert(id, track.title.clone());
        Ok(id)
    }

    /// Match a completion to the download that produced it. Unknown ids
    /// (already resolved) yield `None`.
    pub fn finish(&mut self, event: DownloadEvent) -> Option<Finished> {
        let title = self.pending.remove(&event.id)?;
        match &event.result {
            Ok(path) => info!(id = event.id, path = %path.display(), "download finished"),
            Err(e) => warn!(id = event.id, error = %e, "download failed"),
        }
        Some(Finished {
            title,
            result: event.result,
        })
    }
}

#[cfg(test)]
mod tests;
