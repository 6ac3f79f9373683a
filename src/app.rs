use crate::state::app_settings::{AppSettings, LeagueConfig};
use crate::state::app_state::{AppState, LoadPhase, SeasonState};
use crate::state::cache::CachedSeason;
use crate::state::messages::{NetworkRequest, SeasonTicket};
use chrono::Local;
use log::{error, info};
use mnps_api::{League, RawMatchupRecord, Roster, SeasonKey, SortKey, User, WeekNumber};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Standings,
    Weekly,
    Playoffs,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        let app = Self {
            state: AppState::new(),
            settings,
        };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    pub fn active_league(&self) -> &LeagueConfig {
        let leagues = &self.settings.leagues;
        &leagues[self.state.league_index % leagues.len()]
    }

    pub fn history_request(&self) -> NetworkRequest {
        NetworkRequest::LoadHistory {
            league: self.active_league().clone(),
        }
    }

    /// Load the selected season under a fresh ticket. Anything still
    /// arriving for an earlier ticket is ignored from here on.
    pub fn request_season_load(&mut self, force_refresh: bool) -> Option<NetworkRequest> {
        let league = self.state.history.selected()?.clone();
        // Only the newest season can still be in progress.
        let complete = league.status.is_complete() || self.state.history.selected > 0;

        self.state.generation += 1;
        let ticket = SeasonTicket {
            key: SeasonKey::new(league.id, league.season, self.active_league().variant),
            generation: self.state.generation,
        };
        let switching = self
            .state
            .season
            .ticket
            .as_ref()
            .is_none_or(|t| t.key != ticket.key);

        info!("loading {} (load #{})", ticket.key, ticket.generation);
        self.state.season.begin(ticket.clone(), league.name, complete);
        if switching {
            self.state.view.follow_latest = true;
            self.state.view.scroll_offset = 0;
        }

        Some(NetworkRequest::LoadSeason {
            ticket,
            complete,
            force_refresh,
        })
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_history_loaded(
        &mut self,
        league: LeagueConfig,
        seasons: Vec<League>,
    ) -> Option<NetworkRequest> {
        if league != *self.active_league() {
            return None;
        }
        self.state.last_error = None;
        self.state.history.replace(seasons);
        self.request_season_load(false)
    }

    pub fn on_season_restored(&mut self, ticket: SeasonTicket, cached: CachedSeason) {
        if !self.state.season.accepts(&ticket) {
            return;
        }
        let season = &mut self.state.season;
        season.apply_directory(&cached.rosters, &cached.users);
        for (week, records) in &cached.weeks {
            season.apply_week(*week, records);
        }
        season.last_updated = Some(cached.fetched_at.with_timezone(&Local));
        self.sync_selected_week();
    }

    pub fn on_directory_loaded(&mut self, ticket: SeasonTicket, rosters: Vec<Roster>, users: Vec<User>) {
        if self.state.season.accepts(&ticket) {
            self.state.season.apply_directory(&rosters, &users);
        }
    }

    pub fn on_weeks_loaded(
        &mut self,
        ticket: SeasonTicket,
        weeks: Vec<(WeekNumber, Vec<RawMatchupRecord>)>,
    ) {
        if !self.state.season.accepts(&ticket) {
            return;
        }
        for (week, records) in &weeks {
            self.state.season.apply_week(*week, records);
        }
        self.sync_selected_week();
    }

    pub fn on_season_finished(&mut self, ticket: SeasonTicket) {
        if !self.state.season.accepts(&ticket) {
            return;
        }
        let season = &mut self.state.season;
        if season.phase == LoadPhase::Loading {
            season.phase = LoadPhase::Ready;
            self.state.last_error = None;
        }
        season.mark_updated();
        self.sync_selected_week();
    }

    /// Errors for a superseded ticket are dropped; everything else is shown
    /// until the next successful load.
    pub fn on_error(&mut self, ticket: Option<SeasonTicket>, message: String) {
        if let Some(ticket) = &ticket {
            if !self.state.season.accepts(ticket) {
                return;
            }
            self.state.season.phase = LoadPhase::Failed;
        }
        error!("{message}");
        self.state.last_error = Some(message);
    }

    /// Periodic refresh: only an in-progress season that is not already
    /// loading gets refetched.
    pub fn on_refresh_due(&mut self) -> Option<NetworkRequest> {
        let season = &self.state.season;
        if season.ticket.is_none() || season.complete || season.phase == LoadPhase::Loading {
            return None;
        }
        self.request_season_load(true)
    }

    /// Manual refresh. Without a season list the history walk is retried.
    pub fn refresh(&mut self) -> Option<NetworkRequest> {
        if self.state.history.seasons.is_empty() {
            return Some(self.history_request());
        }
        self.request_season_load(true)
    }

    // -----------------------------------------------------------------------
    // Season and league navigation
    // -----------------------------------------------------------------------

    pub fn select_older_season(&mut self) -> Option<NetworkRequest> {
        if self.state.history.older() {
            self.request_season_load(false)
        } else {
            None
        }
    }

    pub fn select_newer_season(&mut self) -> Option<NetworkRequest> {
        if self.state.history.newer() {
            self.request_season_load(false)
        } else {
            None
        }
    }

    /// Switch to the next configured league and start over from its history.
    pub fn next_league(&mut self) -> Option<NetworkRequest> {
        if self.settings.leagues.len() < 2 {
            return None;
        }
        self.state.league_index = (self.state.league_index + 1) % self.settings.leagues.len();
        self.state.history.replace(Vec::new());
        self.state.season = SeasonState::default();
        self.state.last_error = None;
        Some(self.history_request())
    }

    // -----------------------------------------------------------------------
    // View controls
    // -----------------------------------------------------------------------

    pub fn sort_by(&mut self, key: SortKey) {
        self.state.view.sort_by(key);
    }

    pub fn sort_by_selected_week(&mut self) {
        let week = self.state.view.selected_week;
        self.state.view.sort_by(SortKey::WeekPoints(week));
    }

    pub fn next_week(&mut self) {
        let last = self.state.season.last_visible_week();
        self.state.view.follow_latest = false;
        self.state.view.next_week(last);
    }

    pub fn prev_week(&mut self) {
        self.state.view.follow_latest = false;
        self.state.view.prev_week();
    }

    pub fn scroll_down(&mut self) {
        let rows = self.state.season.directory.len();
        self.state.view.scroll_down(rows);
    }

    pub fn scroll_up(&mut self) {
        self.state.view.scroll_up();
    }

    fn sync_selected_week(&mut self) {
        let last = self.state.season.last_visible_week();
        let view = &mut self.state.view;
        if view.follow_latest {
            view.selected_week = last;
        } else {
            view.clamp_week(last);
        }
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        self.state.view.scroll_offset = 0;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mnps_api::{LeagueStatus, LeagueVariant, TeamId};
    use std::collections::BTreeMap;

    fn settings(leagues: &[(&str, LeagueVariant)]) -> AppSettings {
        AppSettings {
            leagues: leagues
                .iter()
                .map(|(id, variant)| LeagueConfig {
                    league_id: id.to_string(),
                    variant: *variant,
                })
                .collect(),
            ..AppSettings::default()
        }
    }

    fn league(id: &str, season: u16, status: LeagueStatus) -> League {
        League {
            id: id.to_string(),
            name: "Monday Night Points".to_string(),
            season,
            status,
            previous_league_id: None,
        }
    }

    fn history() -> Vec<League> {
        vec![
            league("300", 2025, LeagueStatus::InSeason),
            league("200", 2024, LeagueStatus::Complete),
            league("100", 2023, LeagueStatus::InSeason),
        ]
    }

    fn week(points: &[f64]) -> Vec<RawMatchupRecord> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| RawMatchupRecord::new(i as u32 + 1, p))
            .collect()
    }

    fn load_ticket(request: Option<NetworkRequest>) -> (SeasonTicket, bool) {
        match request {
            Some(NetworkRequest::LoadSeason { ticket, complete, .. }) => (ticket, complete),
            other => panic!("expected a season load, got {other:?}"),
        }
    }

    fn started_app() -> (App, SeasonTicket) {
        let mut app = App::new(settings(&[("300", LeagueVariant::Redraft)]));
        let league = app.active_league().clone();
        let (ticket, _) = load_ticket(app.on_history_loaded(league, history()));
        (app, ticket)
    }

    #[test]
    fn history_starts_newest_season() {
        let (app, ticket) = started_app();
        assert_eq!(ticket.key, SeasonKey::new("300", 2025, LeagueVariant::Redraft));
        assert_eq!(ticket.generation, 1);
        assert_eq!(app.state.season.phase, LoadPhase::Loading);
        assert!(!app.state.season.complete);
    }

    #[test]
    fn older_seasons_load_as_complete() {
        let (mut app, _) = started_app();
        let (ticket, complete) = load_ticket(app.select_older_season());
        assert_eq!(ticket.key.season, 2024);
        assert!(complete);

        // Status says in season, but a newer season exists.
        let (ticket, complete) = load_ticket(app.select_older_season());
        assert_eq!(ticket.key.season, 2023);
        assert!(complete);
        assert!(app.select_older_season().is_none());
    }

    #[test]
    fn stale_responses_are_ignored() {
        let (mut app, first) = started_app();
        let (second, _) = load_ticket(app.select_older_season());

        app.on_weeks_loaded(first.clone(), vec![(1, week(&[150.0, 10.0]))]);
        app.on_error(Some(first.clone()), "late failure".into());
        app.on_season_finished(first);
        assert!(app.state.season.weeks.is_empty());
        assert!(app.state.last_error.is_none());
        assert_eq!(app.state.season.phase, LoadPhase::Loading);

        app.on_weeks_loaded(second.clone(), vec![(1, week(&[120.0, 90.0]))]);
        app.on_season_finished(second);
        assert_eq!(app.state.season.weeks.len(), 1);
        assert_eq!(app.state.season.phase, LoadPhase::Ready);
    }

    #[test]
    fn reloading_same_season_rejects_previous_generation() {
        let (mut app, first) = started_app();
        let (second, _) = load_ticket(app.refresh());
        assert_eq!(first.key, second.key);
        assert!(second.generation > first.generation);

        app.on_weeks_loaded(first, vec![(1, week(&[150.0]))]);
        assert!(app.state.season.weeks.is_empty());
    }

    #[test]
    fn history_for_another_league_is_ignored() {
        let mut app = App::new(settings(&[
            ("300", LeagueVariant::Redraft),
            ("900", LeagueVariant::Dynasty),
        ]));
        let first = app.active_league().clone();
        assert!(matches!(
            app.next_league(),
            Some(NetworkRequest::LoadHistory { league }) if league.league_id == "900"
        ));
        assert!(app.on_history_loaded(first, history()).is_none());
        assert!(app.state.history.seasons.is_empty());
    }

    #[test]
    fn switching_league_drops_in_flight_season() {
        let mut app = App::new(settings(&[
            ("300", LeagueVariant::Redraft),
            ("900", LeagueVariant::Dynasty),
        ]));
        let league = app.active_league().clone();
        let (ticket, _) = load_ticket(app.on_history_loaded(league, history()));
        app.next_league();
        app.on_weeks_loaded(ticket, vec![(1, week(&[100.0]))]);
        assert!(app.state.season.weeks.is_empty());
    }

    #[test]
    fn restored_complete_season_is_usable() {
        let (mut app, _) = started_app();
        let (ticket, _) = load_ticket(app.select_older_season());
        let cached = CachedSeason {
            key: ticket.key.clone(),
            complete: true,
            rosters: vec![Roster {
                team_id: TeamId(1),
                owner_id: Some("u1".into()),
            }],
            users: vec![User {
                user_id: "u1".into(),
                display_name: Some("Alpha".into()),
            }],
            weeks: BTreeMap::from([(1, week(&[100.0, 80.0])), (2, week(&[90.0, 95.0]))]),
            fetched_at: Utc::now(),
        };
        app.on_season_restored(ticket.clone(), cached);
        app.on_season_finished(ticket);

        let season = &app.state.season;
        assert_eq!(season.directory.name(TeamId(1)), "Alpha");
        assert_eq!(season.regular().len(), 2);
        assert_eq!(app.state.view.selected_week, mnps_api::LAST_WEEK);
        assert!(season.last_updated.is_some());
    }

    #[test]
    fn periodic_refresh_only_for_idle_in_progress_season() {
        let (mut app, ticket) = started_app();
        assert!(app.on_refresh_due().is_none(), "still loading");

        app.on_season_finished(ticket);
        assert!(matches!(
            app.on_refresh_due(),
            Some(NetworkRequest::LoadSeason { force_refresh: true, .. })
        ));

        let (ticket, _) = load_ticket(app.select_older_season());
        app.on_season_finished(ticket);
        assert!(app.on_refresh_due().is_none(), "completed season");
    }

    #[test]
    fn selected_week_follows_until_user_moves_it() {
        let (mut app, ticket) = started_app();
        app.on_weeks_loaded(
            ticket.clone(),
            vec![(1, week(&[100.0])), (2, week(&[90.0])), (3, week(&[0.0]))],
        );
        assert_eq!(app.state.view.selected_week, 2);

        app.prev_week();
        app.on_weeks_loaded(ticket, vec![(3, week(&[80.0]))]);
        assert_eq!(app.state.view.selected_week, 1);

        app.sort_by_selected_week();
        assert_eq!(app.state.view.sort.key, SortKey::WeekPoints(1));
    }

    #[test]
    fn errors_without_ticket_are_shown() {
        let mut app = App::new(AppSettings::default());
        app.on_error(None, "league not found".into());
        assert_eq!(app.state.last_error.as_deref(), Some("league not found"));
        assert!(matches!(app.refresh(), Some(NetworkRequest::LoadHistory { .. })));
    }
}
