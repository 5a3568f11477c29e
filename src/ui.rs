//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, PlaybackState, SearchDialog};
use crate::config::{ControlsSettings, UiSettings};
use crate::library::Track;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play");
    map.insert("space/p", "pause/resume");
    // H/L is filled dynamically from config.
    map.insert("r", "repeat");
    map.insert("i", "details");
    map.insert("s", "search");
    map.insert("dd", "delete");
    map.insert("w", "download");
    map.insert("x", "dismiss");
    map.insert("/", "filter");
    map.insert("q", "quit");
    map
});

const SEARCH_HINT: &str =
    " search: [enter] search/preview | [tab] edit/results | [a] add | [w] download | [esc] close ";

const LEFT_PAD: Padding = Padding {
    left: 1,
    right: 0,
    top: 0,
    bottom: 0,
};

/// Render the controls help text, incorporating the skip step.
fn controls_text(skip_seconds: u64) -> String {
    let order = [
        "j/k", "gg/G", "enter", "space/p", "H/L", "r", "i", "s", "w", "dd", "x", "/", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] -/+{skip_seconds}s"))
            } else {
                CONTROLS_MAP.get(k).map(|v| format!("[{k}] {v}"))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format an optional duration, rounding up partial seconds.
fn format_duration_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// `elapsed / total`, or just `elapsed` when the length is unknown.
fn progress_text(position: Duration, duration: Duration) -> String {
    if duration.is_zero() {
        format_mmss(position)
    } else {
        format!("{} / {}", format_mmss(position), format_mmss(duration))
    }
}

fn progress_ratio(position: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width: width.min(r.width),
        height: height.min(r.height),
    }
}

/// Window of `total` rows around `sel_pos` that fits `height`.
/// Returns `(start, end, selected_in_window)`.
fn visible_window(total: usize, height: usize, sel_pos: usize) -> (usize, usize, usize) {
    if total <= height || height == 0 {
        return (0, total, sel_pos);
    }
    let half = height / 2;
    let mut start = sel_pos.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height, sel_pos - start)
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();

    let state = match app.playback_state() {
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
        PlaybackState::Stopped => "Stopped",
    };
    parts.push(state.to_string());

    if let Some(track) = &app.playback.current {
        parts.push(format!(
            "Song: {} [{}]",
            track.display(),
            progress_text(app.playback.position, app.playback.duration)
        ));
    }

    parts.push(if app.playback.repeat {
        "Repeat: ON".to_string()
    } else {
        "Repeat: OFF".to_string()
    });

    parts.push(if app.follow_playback {
        "Cursor: Follow".to_string()
    } else {
        "Cursor: Free-roam".to_string()
    });

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        let mut filter_part = String::from("Filter:");
        if !q.is_empty() {
            filter_part.push(' ');
            filter_part.push_str(q);
        }
        parts.push(filter_part);
    }

    parts.join(" • ")
}

/// Render `title` with the fuzzy-matched characters upper-cased.
fn highlight_matches(title: &str, positions: Vec<usize>) -> String {
    let mut rendered = String::with_capacity(title.len());
    let mut pos_iter = positions.into_iter();
    let mut next_pos = pos_iter.next();

    for (ci, ch) in title.chars().enumerate() {
        if next_pos == Some(ci) {
            rendered.extend(ch.to_uppercase());
            next_pos = pos_iter.next();
        } else {
            rendered.push(ch);
        }
    }
    rendered
}

fn draw_track_list(frame: &mut Frame, app: &App, display: &[usize], area: Rect) {
    let q = app.filter_query.trim();
    let query_lower = (!q.is_empty() && app.uses_lower_titles()).then(|| q.to_ascii_lowercase());

    // Only build ListItems for the visible window.
    let total = display.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
    let (start, end, selected_in_window) = visible_window(total, list_height, sel_pos);

    let tracks = app.tracks();
    let visible_items: Vec<ListItem> = display[start..end]
        .iter()
        .filter_map(|&i| tracks.get(i).map(|t| (i, t)))
        .map(|(i, track)| {
            let title = track.display();
            let marker = if app.playback.is_current(track) {
                if app.playback.playing { "♪ " } else { "‖ " }
            } else {
                "  "
            };
            let positions = if q.is_empty() {
                None
            } else {
                match query_lower.as_deref() {
                    Some(ql) => app.fuzzy_match_positions_for_track_lower(i, ql),
                    None => App::fuzzy_match_positions(&title, q),
                }
            };
            let text = match positions {
                Some(p) => highlight_matches(&title, p),
                None => title,
            };
            ListItem::new(format!("{marker}{text}"))
        })
        .collect();

    let list = List::new(visible_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" tracks ({}) ", total)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(selected_in_window));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn detail_text(track: &Track) -> String {
    format!(
        "Title: {}\nArtist: {}\nDuration: {}\nSource: {}\nId: {}",
        track.title,
        track.artist_or_unknown(),
        format_duration_ceil(track.duration),
        track.locator,
        track.id,
    )
}

fn draw_detail(frame: &mut Frame, app: &App, track: &Track, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    let info = Paragraph::new(detail_text(track))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .padding(LEFT_PAD)
                .title(" details (i/esc: back | 0-9: jump) "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(info, chunks[0]);

    let (ratio, label) = if app.playback.is_current(track) {
        let state = if app.playback.playing { "playing" } else { "paused" };
        (
            progress_ratio(app.playback.position, app.playback.duration),
            format!(
                "{} ({state})",
                progress_text(app.playback.position, app.playback.duration)
            ),
        )
    } else {
        (0.0, "not playing".to_string())
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" progress "))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, chunks[1]);
}

fn search_status(dialog: &SearchDialog) -> String {
    if dialog.loading {
        "Loading...".to_string()
    } else if let Some(err) = &dialog.error {
        err.clone()
    } else if dialog.generation == 0 {
        "Type a title or artist and press enter".to_string()
    } else {
        format!("{} result(s)", dialog.results.len())
    }
}

fn draw_search(frame: &mut Frame, app: &App, dialog: &SearchDialog, area: Rect) {
    let popup = centered_rect_sized(90, 24, area);
    frame.render_widget(Clear, popup);

    let outer = Block::default().borders(Borders::ALL).title(SEARCH_HINT);
    let inner = outer.inner(popup);
    frame.render_widget(outer, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let cursor = if dialog.editing { "_" } else { "" };
    let input = Paragraph::new(format!("{}{cursor}", dialog.query)).block(
        Block::default()
            .borders(Borders::ALL)
            .padding(LEFT_PAD)
            .title(" query "),
    );
    frame.render_widget(input, chunks[0]);

    let status = Paragraph::new(search_status(dialog)).italic();
    frame.render_widget(status, chunks[1]);

    let height = chunks[2].height as usize;
    let (start, end, selected_in_window) =
        visible_window(dialog.results.len(), height, dialog.selected);
    let items: Vec<ListItem> = dialog.results[start..end]
        .iter()
        .map(|track| {
            let marker = if app.is_playing_track(track) { "⏸ " } else { "▶ " };
            ListItem::new(format!(
                "{marker}{} - {} ({})",
                track.title,
                track.artist_or_unknown(),
                format_duration_ceil(track.duration)
            ))
        })
        .collect();
    let list = List::new(items).highlight_style(if dialog.editing {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    });
    let mut state = ListState::default();
    if !dialog.results.is_empty() {
        state.select(Some(selected_in_window));
    }
    frame.render_stateful_widget(list, chunks[2], &mut state);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" reprise ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app))
        .block(Block::bordered().padding(LEFT_PAD).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    match app.detail_track() {
        Some(track) => draw_detail(frame, app, track, chunks[2]),
        None => draw_track_list(frame, app, display, chunks[2]),
    }

    if let Some(dialog) = &app.search {
        draw_search(frame, app, dialog, chunks[2]);
    }

    if let Some(msg) = app.toast() {
        let toast = Paragraph::new(format!(" {msg}")).bold();
        frame.render_widget(toast, chunks[3]);
    }

    let footer = Paragraph::new(controls_text(controls_settings.skip_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(LEFT_PAD),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests;
