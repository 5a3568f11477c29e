use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info, warn};

use crate::app::{App, PlaybackState, View};
use crate::audio::{AudioCmd, AudioEvent, AudioPlayer, PlaybackHandle};
use crate::config;
use crate::download::{DownloadEvent, Downloader};
use crate::error::DownloadError;
use crate::library::Track;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::update_mpris_position;
use crate::search::{SearchClient, SearchOutcome, spawn_search};
use crate::ui;

const INPUT_SLICE: Duration = Duration::from_millis(50);

/// Handles and channels the loop talks to.
pub struct Context {
    pub audio_player: AudioPlayer,
    pub audio_events: mpsc::Receiver<AudioEvent>,
    pub mpris: MprisHandle,
    pub control_tx: mpsc::Sender<ControlCmd>,
    pub control_rx: mpsc::Receiver<ControlCmd>,
    pub search_client: Option<Arc<SearchClient>>,
    pub search_tx: mpsc::Sender<SearchOutcome>,
    pub search_rx: mpsc::Receiver<SearchOutcome>,
    pub downloader: Option<Downloader>,
    pub download_rx: mpsc::Receiver<DownloadEvent>,
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Two-key prefix state used for `dd` handling.
    pub pending_dd: bool,
    /// When the playback snapshot was last read.
    last_poll: Option<Instant>,
}

impl EventLoopState {
    fn clear_pending(&mut self) {
        self.pending_gg = false;
        self.pending_dd = false;
    }

    /// Force a snapshot read on the next iteration.
    fn poll_soon(&mut self) {
        self.last_poll = None;
    }
}

/// Main terminal event loop: handles input, UI drawing, worker results and
/// MPRIS requests. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    ctx: &mut Context,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let playback_handle = ctx.audio_player.playback_handle();
    let poll_interval = Duration::from_millis(settings.ui.poll_interval_ms);

    loop {
        drain_worker_results(app, ctx);

        let now = Instant::now();
        if state.last_poll.is_none_or(|t| now.duration_since(t) >= poll_interval) {
            sync_playback(app, &playback_handle, &ctx.mpris);
            state.last_poll = Some(now);
        }
        app.expire_toast(now);

        let display = app.display_indices();
        terminal.draw(|f| ui::draw(f, app, &display, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = ctx.control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, ctx)? {
                return Ok(());
            }
            state.poll_soon();
        }

        if event::poll(INPUT_SLICE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, ctx, state)? {
                    break;
                }
                state.poll_soon();
            }
        }
    }

    Ok(())
}

fn sync_playback(app: &mut App, handle: &PlaybackHandle, mpris: &MprisHandle) {
    let snapshot = match handle.lock() {
        Ok(info) => info.clone(),
        Err(_) => return,
    };
    update_mpris_position(mpris, &snapshot);
    app.sync_playback(snapshot);
}

fn drain_worker_results(app: &mut App, ctx: &mut Context) {
    while let Ok(event) = ctx.audio_events.try_recv() {
        match event {
            AudioEvent::PlaybackFailed { title, message } => {
                app.notify(format!("Cannot play {title}: {message}"));
            }
        }
    }

    while let Ok(outcome) = ctx.search_rx.try_recv() {
        let generation = outcome.generation;
        let query = outcome.query.clone();
        let failed = outcome.result.is_err();
        if !app.apply_search(outcome) {
            debug!(generation, %query, "dropping stale search result");
        } else if failed {
            app.notify(format!("Search for \"{query}\" failed"));
        }
    }

    while let Ok(event) = ctx.download_rx.try_recv() {
        let Some(downloader) = ctx.downloader.as_mut() else {
            continue;
        };
        if let Some(finished) = downloader.finish(event) {
            match finished.result {
                Ok(_) => app.notify(format!("Download finished: {}", finished.title)),
                Err(_) => app.notify(format!("Download failed: {}", finished.title)),
            }
        }
    }
}

fn send(ctx: &Context, cmd: AudioCmd) {
    if let Err(e) = ctx.audio_player.send(cmd) {
        warn!(error = %e, "audio thread is gone");
    }
}

fn quit(settings: &config::Settings, ctx: &Context) {
    info!("quitting");
    ctx.audio_player
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
}

fn play(app: &mut App, ctx: &Context, track: Track) {
    if !app.filter_mode {
        app.follow_playback_on();
    }
    send(ctx, AudioCmd::Play(track));
}

fn skip_step(settings: &config::Settings) -> Duration {
    Duration::from_secs(settings.controls.skip_seconds)
}

fn handle_control_cmd(
    cmd: ControlCmd,
    settings: &config::Settings,
    app: &mut App,
    ctx: &Context,
) -> Result<bool, Box<dyn std::error::Error>> {
    debug!(?cmd, "MPRIS request");
    match cmd {
        ControlCmd::Quit => {
            quit(settings, ctx);
            return Ok(true);
        }
        ControlCmd::Play => match app.playback_state() {
            PlaybackState::Stopped => {
                if let Some(track) = app.selected_track().cloned() {
                    play(app, ctx, track);
                }
            }
            PlaybackState::Paused | PlaybackState::Playing => send(ctx, AudioCmd::Resume),
        },
        ControlCmd::Pause => send(ctx, AudioCmd::Pause),
        ControlCmd::PlayPause => match app.playback_state() {
            PlaybackState::Stopped => {
                if let Some(track) = app.selected_track().cloned() {
                    play(app, ctx, track);
                }
            }
            PlaybackState::Paused | PlaybackState::Playing => send(ctx, AudioCmd::TogglePause),
        },
        ControlCmd::Stop => send(ctx, AudioCmd::Dismiss),
        ControlCmd::Seek(offset) => {
            let step = Duration::from_micros(offset.unsigned_abs());
            if offset >= 0 {
                send(ctx, AudioCmd::Forward(step));
            } else {
                send(ctx, AudioCmd::Rewind(step));
            }
        }
        ControlCmd::SetPosition(to) => send(ctx, AudioCmd::SeekTo(to)),
        ControlCmd::SetRepeat(on) => send(ctx, AudioCmd::SetRepeat(on)),
    }

    Ok(false)
}

fn start_search(app: &mut App, ctx: &Context) {
    let Some((generation, query)) = app.begin_search() else {
        return;
    };
    match &ctx.search_client {
        Some(client) => {
            spawn_search(Arc::clone(client), generation, query, ctx.search_tx.clone());
        }
        None => {
            if let Some(dialog) = app.search.as_mut() {
                dialog.loading = false;
                dialog.error = Some("Search is unavailable".to_string());
            }
        }
    }
}

fn start_download(app: &mut App, ctx: &mut Context, track: Option<Track>) {
    let Some(track) = track else {
        return;
    };
    let Some(downloader) = ctx.downloader.as_mut() else {
        app.notify("Downloads are unavailable: no download directory");
        return;
    };
    match downloader.start(&track) {
        Ok(_) => app.notify(format!("Download started: {}", track.title)),
        Err(DownloadError::NotRemote) => app.notify("Only remote tracks can be downloaded"),
        Err(e) => {
            warn!(error = %e, "download could not start");
            app.notify(format!("Download failed: {e}"));
        }
    }
}

fn add_to_library(app: &mut App, track: Track) {
    let title = track.title.clone();
    match app.add_external(track) {
        Ok(true) => app.notify(format!("Added: {title}")),
        Ok(false) => app.notify(format!("Already in library: {title}")),
        Err(e) => {
            warn!(error = %e, "failed to persist added track");
            app.notify(format!("Could not save {title}: {e}"));
        }
    }
}

fn delete_selected(app: &mut App) {
    match app.delete_selected() {
        Ok(Some(track)) => {
            info!(id = %track.id, title = %track.title, "track deleted");
            app.notify(format!("Deleted: {}", track.title));
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "failed to persist deletion");
            app.notify(format!("Delete not saved: {e}"));
        }
    }
}

fn handle_search_key(key: KeyEvent, app: &mut App, ctx: &mut Context) {
    let Some(dialog) = app.search.as_mut() else {
        return;
    };

    if dialog.editing {
        match key.code {
            KeyCode::Esc => app.close_search(),
            KeyCode::Enter => start_search(app, ctx),
            KeyCode::Backspace => dialog.pop_char(),
            KeyCode::Tab | KeyCode::Down => {
                if !dialog.results.is_empty() {
                    dialog.editing = false;
                }
            }
            KeyCode::Char(c) if !c.is_control() => dialog.push_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_search(),
        KeyCode::Tab | KeyCode::Char('/') => dialog.editing = true,
        KeyCode::Char('j') | KeyCode::Down => dialog.next(),
        KeyCode::Char('k') | KeyCode::Up => dialog.prev(),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('p') => {
            if let Some(track) = dialog.selected_result().cloned() {
                let cmd = app.toggle_command(&track);
                send(ctx, cmd);
            }
        }
        KeyCode::Char('a') => {
            if let Some(track) = dialog.selected_result().cloned() {
                add_to_library(app, track);
            }
        }
        KeyCode::Char('w') => {
            let track = dialog.selected_result().cloned();
            start_download(app, ctx, track);
        }
        _ => {}
    }
}

fn handle_filter_key(key: KeyEvent, app: &mut App, ctx: &Context) {
    match key.code {
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Char(c) => {
            if !c.is_control() {
                app.push_filter_char(c);
            }
        }
        KeyCode::Enter => {
            if app.display_indices().is_empty() {
                return;
            }
            app.exit_filter_mode();
            if let Some(track) = app.selected_track().cloned() {
                play(app, ctx, track);
            }
        }
        _ => {}
    }
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    ctx: &mut Context,
    state: &mut EventLoopState,
) -> Result<bool, Box<dyn std::error::Error>> {
    if app.search.is_some() {
        state.clear_pending();
        handle_search_key(key, app, ctx);
        return Ok(false);
    }

    if app.filter_mode {
        state.clear_pending();
        handle_filter_key(key, app, ctx);
        return Ok(false);
    }

    let in_library = app.view == View::Library;

    match key.code {
        KeyCode::Char('q') => {
            state.clear_pending();
            quit(settings, ctx);
            return Ok(true);
        }
        KeyCode::Char('g') if in_library => {
            state.pending_dd = false;
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('d') if in_library => {
            state.pending_gg = false;
            if state.pending_dd {
                state.pending_dd = false;
                delete_selected(app);
            } else {
                state.pending_dd = true;
            }
        }
        code => {
            state.clear_pending();
            handle_plain_key(code, settings, app, ctx, in_library);
        }
    }

    Ok(false)
}

fn handle_plain_key(
    code: KeyCode,
    settings: &config::Settings,
    app: &mut App,
    ctx: &mut Context,
    in_library: bool,
) {
    match code {
        KeyCode::Char('/') if in_library => app.enter_filter_mode(),
        KeyCode::Char('G') if in_library => {
            app.follow_playback_off();
            app.select_last();
        }
        KeyCode::Char('j') | KeyCode::Down if in_library => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up if in_library => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if let Some(track) = app.focused_track().cloned() {
                play(app, ctx, track);
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = ctx.control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('H') => send(ctx, AudioCmd::Rewind(skip_step(settings))),
        KeyCode::Char('L') => send(ctx, AudioCmd::Forward(skip_step(settings))),
        KeyCode::Char('r') => send(ctx, AudioCmd::ToggleRepeat),
        KeyCode::Char('x') => send(ctx, AudioCmd::Dismiss),
        KeyCode::Char('i') => {
            if in_library {
                app.open_detail();
            } else {
                app.close_detail();
            }
        }
        KeyCode::Esc => app.close_detail(),
        KeyCode::Char(c) if !in_library && c.is_ascii_digit() => {
            if let Some(to) = c.to_digit(10).and_then(|n| app.jump_target(n)) {
                send(ctx, AudioCmd::SeekTo(to));
            }
        }
        KeyCode::Char('s') => app.open_search(),
        KeyCode::Char('w') => {
            let track = app.focused_track().cloned();
            start_download(app, ctx, track);
        }
        _ => {}
    }
}
