use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::{AudioPlayer, AudioThreadConfig};
use crate::download::Downloader;
use crate::library::{AdjustmentStore, Catalog};
use crate::mpris::{ControlCmd, spawn_mpris};
use crate::search::SearchClient;

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, fallback) = settings::load_settings();

    if let Some(path) = settings.log_path() {
        if let Err(e) = logging::init_file_logging(&path) {
            eprintln!("reprise: cannot open log file {}: {e}", path.display());
        }
    }
    settings::report_fallback(fallback.as_deref());
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let store = settings
        .store_path()
        .map(AdjustmentStore::new)
        .unwrap_or_else(AdjustmentStore::in_memory);
    let catalog = Catalog::load(&settings, store);
    if catalog.is_empty() {
        warn!("library is empty: no demo tracks and no audio files found");
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = spawn_mpris(control_tx.clone());

    let (audio_player, audio_events) = AudioPlayer::new(
        mpris.clone(),
        AudioThreadConfig {
            demo_dir: settings.demo_dir().unwrap_or_default(),
            fetch_timeout: Duration::from_millis(settings.search.timeout_ms),
            repeat: settings.audio.repeat,
        },
    )?;

    let search_client = match SearchClient::new(&settings.search) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "search client unavailable");
            None
        }
    };
    let (search_tx, search_rx) = mpsc::channel();

    let (download_tx, download_rx) = mpsc::channel();
    let downloader = settings
        .download_dir()
        .and_then(|dir| match Downloader::new(dir, download_tx) {
            Ok(d) => {
                info!(dir = %d.dir().display(), "downloads enabled");
                Some(d)
            }
            Err(e) => {
                warn!(error = %e, "downloads disabled");
                None
            }
        });

    let mut app = App::new(catalog);
    app.follow_playback = settings.ui.follow_playback;
    app.set_toast_ttl(Duration::from_millis(settings.ui.toast_ms));

    let mut ctx = event_loop::Context {
        audio_player,
        audio_events,
        mpris,
        control_tx,
        control_rx,
        search_client,
        search_tx,
        search_rx,
        downloader,
        download_rx,
    };

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &mut ctx, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(pending) = ctx.downloader.as_ref().map(|d| d.pending()).filter(|n| *n > 0) {
        warn!(pending, "exiting with unfinished downloads");
    }
    // No-op when the loop already quit the audio thread.
    ctx.audio_player.quit_softly(Duration::ZERO);
    info!("stopped");

    run_result
}
