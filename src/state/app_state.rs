use crate::app::MenuItem;
use crate::state::messages::SeasonTicket;
use chrono::{DateTime, Local};
use log::warn;
use mnps_api::{
    FIRST_WEEK, LAST_WEEK, League, LeagueVariant, PLAYOFF_START, RawMatchupRecord, Roster, SeasonAggregate,
    SeasonWeeks, SortKey, SortSpec, TeamDirectory, TeamId, User, WeekNumber, WeekWindow,
    aggregate, aggregate_qualifiers, build_directory, classify_week, multiplier_for_season,
    playoff_week_leader, qualifiers, QUALIFIER_COUNT,
};

// ---------------------------------------------------------------------------
// Season history
// ---------------------------------------------------------------------------

/// Seasons of the active league, newest first.
#[derive(Debug, Default)]
pub struct SeasonList {
    pub seasons: Vec<League>,
    pub selected: usize,
}

impl SeasonList {
    pub fn replace(&mut self, seasons: Vec<League>) {
        self.seasons = seasons;
        self.selected = 0;
    }

    pub fn selected(&self) -> Option<&League> {
        self.seasons.get(self.selected)
    }

    /// Step back one season. Returns false at the oldest season.
    pub fn older(&mut self) -> bool {
        if self.selected + 1 < self.seasons.len() {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    pub fn newer(&mut self) -> bool {
        if self.selected > 0 {
            self.selected -= 1;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Loaded season
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Data for the season on screen. Only responses carrying the current
/// ticket are applied.
#[derive(Debug, Default)]
pub struct SeasonState {
    pub ticket: Option<SeasonTicket>,
    pub league_name: String,
    pub complete: bool,
    pub directory: TeamDirectory,
    pub weeks: SeasonWeeks,
    /// Malformed feed records dropped while classifying this season.
    pub rejected: usize,
    pub phase: LoadPhase,
    pub last_updated: Option<DateTime<Local>>,
}

impl SeasonState {
    /// Start over for a new load. Data already on screen for the same season
    /// is kept so a refresh does not blank the tables.
    pub fn begin(&mut self, ticket: SeasonTicket, league_name: String, complete: bool) {
        let same_season = self.ticket.as_ref().is_some_and(|t| t.key == ticket.key);
        if !same_season {
            self.directory = TeamDirectory::default();
            self.weeks.clear();
            self.last_updated = None;
        }
        // Refetched weeks are checked again, so the count starts over.
        self.rejected = 0;
        self.ticket = Some(ticket);
        self.league_name = league_name;
        self.complete = complete;
        self.phase = LoadPhase::Loading;
    }

    pub fn accepts(&self, ticket: &SeasonTicket) -> bool {
        self.ticket.as_ref() == Some(ticket)
    }

    pub fn variant(&self) -> LeagueVariant {
        self.ticket
            .as_ref()
            .map(|t| t.key.variant)
            .unwrap_or_default()
    }

    pub fn season(&self) -> Option<u16> {
        self.ticket.as_ref().map(|t| t.key.season)
    }

    pub fn apply_directory(&mut self, rosters: &[Roster], users: &[User]) {
        self.directory = build_directory(rosters, users);
    }

    /// Classify one week under the season's policy and store it, replacing
    /// any earlier copy of that week.
    pub fn apply_week(&mut self, week: WeekNumber, records: &[RawMatchupRecord]) {
        let Some(season) = self.season() else {
            return;
        };
        let outcome = classify_week(
            week,
            records,
            multiplier_for_season(season),
            self.variant().top_cutoff(),
        );
        for rejected in &outcome.rejected {
            warn!("dropped record: {rejected}");
        }
        self.rejected += outcome.rejected.len();
        self.weeks.insert(outcome.week);
    }

    pub fn mark_updated(&mut self) {
        self.last_updated = Some(Local::now());
    }

    /// Week currently being played. `None` once the season is complete, so
    /// every week counts.
    pub fn current_week(&self) -> Option<WeekNumber> {
        if self.complete {
            None
        } else {
            Some(detect_current_week(&self.weeks))
        }
    }

    /// Last week with data worth a column.
    pub fn last_visible_week(&self) -> WeekNumber {
        self.current_week().unwrap_or(LAST_WEEK)
    }

    /// Last week folded into the aggregates. `None` once the season is
    /// complete; `Some(0)` before any team has scored, so fetched weeks that
    /// have not been played never count.
    pub fn played_through(&self) -> Option<WeekNumber> {
        if self.complete {
            None
        } else {
            Some(self.weeks.latest_scored_week().unwrap_or(0))
        }
    }

    pub fn regular(&self) -> SeasonAggregate {
        aggregate(self.weeks.iter(), WeekWindow::regular_season(self.played_through()))
    }

    pub fn playoffs(&self) -> SeasonAggregate {
        aggregate_qualifiers(
            self.weeks.iter(),
            &self.regular(),
            WeekWindow::playoffs(self.played_through()),
        )
    }

    pub fn qualifiers(&self) -> Vec<TeamId> {
        qualifiers(&self.regular(), QUALIFIER_COUNT)
    }

    /// Top scorer among the qualifiers for each playoff week played so far.
    pub fn playoff_leaders(&self) -> Vec<(WeekNumber, TeamId)> {
        let eligible = self.qualifiers();
        (PLAYOFF_START..=LAST_WEEK)
            .filter_map(|week| {
                playoff_week_leader(self.weeks.iter(), week, Some(eligible.as_slice()))
                    .filter(|_| self.weeks.get(week).is_some_and(|w| w.has_scores()))
                    .map(|leader| (week, leader))
            })
            .collect()
    }
}

/// The latest week anyone has scored in, or week 1 before kickoff.
pub fn detect_current_week(weeks: &SeasonWeeks) -> WeekNumber {
    weeks.latest_scored_week().unwrap_or(FIRST_WEEK)
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ViewState {
    pub sort: SortSpec,
    pub selected_week: WeekNumber,
    /// Track the latest week as data arrives, until the user picks a week.
    pub follow_latest: bool,
    pub scroll_offset: u16,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            sort: SortSpec::default(),
            selected_week: FIRST_WEEK,
            follow_latest: true,
            scroll_offset: 0,
        }
    }
}

impl ViewState {
    pub fn sort_by(&mut self, key: SortKey) {
        self.sort = self.sort.toggle(key);
    }

    pub fn next_week(&mut self, last: WeekNumber) {
        if self.selected_week < last {
            self.selected_week += 1;
        }
    }

    pub fn prev_week(&mut self) {
        if self.selected_week > FIRST_WEEK {
            self.selected_week -= 1;
        }
    }

    /// Keep the selection inside `1..=last` after the data changes.
    pub fn clamp_week(&mut self, last: WeekNumber) {
        self.selected_week = self.selected_week.clamp(FIRST_WEEK, last.max(FIRST_WEEK));
    }

    pub fn scroll_down(&mut self, rows: usize) {
        if usize::from(self.scroll_offset) + 1 < rows {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub league_index: usize,
    pub history: SeasonList,
    pub season: SeasonState,
    pub view: ViewState,
    /// Bumped for every season load; feeds [`SeasonTicket::generation`].
    pub generation: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
