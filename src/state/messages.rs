use crate::state::app_settings::LeagueConfig;
use crate::state::cache::CachedSeason;
use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use mnps_api::{League, RawMatchupRecord, Roster, SeasonKey, User, WeekNumber};

/// Identifies one load of one season. The generation is bumped every time
/// the user asks for a season, so responses from an earlier load of the
/// same key can be told apart from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonTicket {
    pub key: SeasonKey,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    /// Walk the league's `previous_league_id` chain.
    LoadHistory { league: LeagueConfig },
    /// Load one season, cancelling any season load still in flight.
    LoadSeason {
        ticket: SeasonTicket,
        complete: bool,
        force_refresh: bool,
    },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    HistoryLoaded {
        league: LeagueConfig,
        seasons: Vec<League>,
    },
    SeasonRestored {
        ticket: SeasonTicket,
        cached: CachedSeason,
    },
    DirectoryLoaded {
        ticket: SeasonTicket,
        rosters: Vec<Roster>,
        users: Vec<User>,
    },
    /// One batch of weeks; later batches follow as they arrive.
    WeeksLoaded {
        ticket: SeasonTicket,
        weeks: Vec<(WeekNumber, Vec<RawMatchupRecord>)>,
    },
    SeasonFinished { ticket: SeasonTicket },
    Error {
        ticket: Option<SeasonTicket>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    RefreshDue,
}
