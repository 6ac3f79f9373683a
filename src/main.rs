mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::{AppSettings, CliAction, parse_args};
use crate::state::cache::{FileCache, NoCache, SeasonCache};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, info};
use mnps_api::client::SleeperApi;
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(settings) = handle_cli_args() else {
        return Ok(());
    };

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(log::LevelFilter::Error)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let cache: Arc<dyn SeasonCache> = if settings.use_cache {
        let cache = FileCache::new(settings.cache_dir.clone());
        info!("caching seasons in {}", cache.dir().display());
        Arc::new(cache)
    } else {
        info!("season cache disabled");
        Arc::new(NoCache)
    };

    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker =
        NetworkWorker::new(SleeperApi::new(), cache, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Periodic refresh thread (every 5 minutes)
    let periodic_updater = PeriodicRefresher::new(ui_event_tx.clone());
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Trigger league load on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();
    periodic_task.abort();

    Ok(())
}

/// Settings to run with, or `None` when the command line was fully handled.
fn handle_cli_args() -> Option<AppSettings> {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    match cli.action {
        CliAction::Help => {
            println!("{}", usage_text());
            None
        }
        CliAction::Version => {
            println!("mnps {}", env!("CARGO_PKG_VERSION"));
            None
        }
        CliAction::Run => {
            let mut settings = AppSettings::load();
            settings.apply_cli(&cli);
            Some(settings)
        }
    }
}

fn usage_text() -> &'static str {
    "mnps - Sleeper fantasy league dashboard (MNPS, top performers, playoffs)

Usage:
  mnps [--league <id>] [--dynasty] [--no-cache]
  mnps --help
  mnps --version

Options:
  -l, --league <id>    Open this Sleeper league first
      --dynasty        Score the league as dynasty (top 5 each week)
      --no-cache       Always fetch from Sleeper; never read or write the cache

Environment:
  MNPS_LEAGUE_ID       League opened on start
  MNPS_LEAGUE_VARIANT  redraft | dynasty
  MNPS_LEAGUES         More leagues to cycle with L, as id:variant,id:variant
  MNPS_CACHE_DIR       Season cache directory (default $XDG_CACHE_HOME/mnps)
  MNPS_LOG_LEVEL       error | warn | info | debug | trace"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            else => break,
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let request = app.lock().await.history_request();
            let _ = network_requests.send(request).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize => true,
        UiEvent::RefreshDue => {
            let request = app.lock().await.on_refresh_due();
            if let Some(request) = request {
                let _ = network_requests.send(request).await;
            }
            false
        }
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    let mut guard = app.lock().await;
    let follow_up = match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            None
        }
        NetworkResponse::HistoryLoaded { league, seasons } => {
            guard.on_history_loaded(league, seasons)
        }
        NetworkResponse::SeasonRestored { ticket, cached } => {
            guard.on_season_restored(ticket, cached);
            None
        }
        NetworkResponse::DirectoryLoaded {
            ticket,
            rosters,
            users,
        } => {
            guard.on_directory_loaded(ticket, rosters, users);
            None
        }
        NetworkResponse::WeeksLoaded { ticket, weeks } => {
            guard.on_weeks_loaded(ticket, weeks);
            None
        }
        NetworkResponse::SeasonFinished { ticket } => {
            guard.on_season_finished(ticket);
            None
        }
        NetworkResponse::Error { ticket, message } => {
            guard.on_error(ticket, message);
            None
        }
    };
    drop(guard);

    if let Some(request) = follow_up {
        let _ = network_requests.send(request).await;
    }
    true
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        let Ok(event) = tokio::task::spawn_blocking(crossterm_event::read).await else {
            break;
        };
        match event {
            Ok(event) => {
                let ui_event = match event {
                    Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                    Event::Resize(_, _) => Some(UiEvent::Resize),
                    _ => None,
                };

                if let Some(ui_event) = ui_event
                    && ui_events.send(ui_event).await.is_err()
                {
                    break;
                }
            }
            Err(e) => error!("failed to read terminal event: {e}"),
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

/// Restore the terminal. Best effort: it also runs from the panic hook.
pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
