//! Error types shared across the player.
//!
//! Each subsystem gets its own enum so callers can decide what is fatal
//! (almost nothing) and what becomes a toast in the UI.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or driving the playback handle.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("no audio output device: {0}")]
    NoOutputDevice(String),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("cannot decode {locator}: {message}")]
    Decode { locator: String, message: String },

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),
}

/// Errors raised by the remote catalog search.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search returned HTTP {0}")]
    Status(u16),

    #[error("malformed search response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the persisted library adjustments store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while downloading a track to disk.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("only remote tracks can be downloaded")]
    NotRemote,

    #[error("download request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download returned HTTP {0}")]
    Status(u16),

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
