use crate::app::{App, MenuItem};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mnps_api::SortKey;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;
    let mut request: Option<NetworkRequest> = None;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Standings),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Weekly),
        (_, Char('3'), _) => guard.update_tab(MenuItem::Playoffs),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Sorting
        (_, Char('n'), _) => guard.sort_by(SortKey::Name),
        (_, Char('p'), _) => guard.sort_by(SortKey::TotalPoints),
        (_, Char('m'), _) => guard.sort_by(SortKey::TotalScore),
        (_, Char('t'), _) => guard.sort_by(SortKey::TopCount),
        (_, Char('g'), _) => guard.sort_by(SortKey::GamesPlayed),
        (_, Char('a'), _) => guard.sort_by(SortKey::AverageScore),
        (_, Char('w'), _) => guard.sort_by_selected_week(),

        // Week selection
        (MenuItem::Weekly, Char('l') | KeyCode::Right, _) => guard.next_week(),
        (MenuItem::Weekly, Char('h') | KeyCode::Left, _) => guard.prev_week(),

        // Scrolling
        (_, Char('j') | KeyCode::Down, _) => guard.scroll_down(),
        (_, Char('k') | KeyCode::Up, _) => guard.scroll_up(),

        // Seasons and leagues
        (_, Char('['), _) => request = guard.select_older_season(),
        (_, Char(']'), _) => request = guard.select_newer_season(),
        (_, Char('L'), _) => request = guard.next_league(),
        (_, Char('r'), _) => request = guard.refresh(),

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }

    drop(guard);
    if let Some(request) = request {
        let _ = network_requests.send(request).await;
    }
}
