//! Remote catalog search.
//!
//! A blocking query against an iTunes-style search endpoint, mapped into
//! [`Track`]s whose locator is the result's preview URL. Queries run on a
//! short-lived worker thread and come back tagged with the generation of the
//! dialog that asked, so the UI can drop answers nobody is waiting for.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::library::{Locator, Track, TrackId};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Map one raw result. Entries without a preview URL or a usable id are
/// dropped.
fn map_result(raw: &Value) -> Option<Track> {
    let preview = raw.get("previewUrl").and_then(Value::as_str)?.trim();
    if preview.is_empty() {
        return None;
    }
    let id = raw
        .get("trackId")
        .and_then(Value::as_i64)
        .and_then(TrackId::new)?;
    let text = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let duration = raw
        .get("trackTimeMillis")
        .and_then(Value::as_i64)
        .filter(|ms| *ms > 0)
        .map(|ms| Duration::from_millis(ms as u64));

    Some(Track::new(
        id,
        text("trackName").unwrap_or(UNKNOWN),
        Some(text("artistName").unwrap_or(UNKNOWN)),
        Locator::Remote(preview.to_string()),
        duration,
    ))
}

/// Parse a search response body into tracks.
pub fn parse_results(body: &str) -> Result<Vec<Track>, SearchError> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    Ok(resp.results.iter().filter_map(map_result).collect())
}

pub struct SearchClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    media: String,
    limit: u32,
}

impl SearchClient {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_millis(settings.timeout_ms))
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            media: settings.media.clone(),
            limit: settings.limit,
        })
    }

    pub fn search(&self, query: &str) -> Result<Vec<Track>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        debug!(query, endpoint = %self.endpoint, "searching");
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("term", query),
                ("media", self.media.as_str()),
                ("limit", &self.limit.to_string()),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        let tracks = parse_results(&resp.text()?)?;
        info!(query, results = tracks.len(), "search finished");
        Ok(tracks)
    }
}

/// A finished search, tagged with the generation that asked for it.
#[derive(Debug)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: String,
    pub result: Result<Vec<Track>, SearchError>,
}

/// Run `query` on a worker thread and send the outcome to `tx`.
pub fn spawn_search(
    client: Arc<SearchClient>,
    generation: u64,
    query: String,
    tx: Sender<SearchOutcome>,
) {
    let spawned = thread::Builder::new()
        .name("search".into())
        .spawn(move || {
            let result = client.search(&query);
            if let Err(e) = &result {
                warn!(query = %query, error = %e, "search failed");
            }
            let _ = tx.send(SearchOutcome {
                generation,
                query,
                result,
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn search worker");
    }
}
