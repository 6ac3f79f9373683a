pub mod aggregate;
pub mod classify;
pub mod client;
pub mod directory;
pub mod policy;
pub mod sleeper;
pub mod standings;

pub use aggregate::{
    SeasonAggregate, SeasonRecord, SeasonWeeks, WeekCell, WeekWindow, aggregate,
    aggregate_qualifiers, playoff_week_leader, qualifiers,
};
pub use classify::{RecordError, WeekOutcome, classify_week};
pub use directory::{TeamDirectory, build_directory};
pub use policy::multiplier_for_season;
pub use standings::{SortDirection, SortKey, SortSpec, Standing, sort_standings};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Season calendar
// ---------------------------------------------------------------------------

pub type WeekNumber = u8;

pub const FIRST_WEEK: WeekNumber = 1;
pub const REGULAR_SEASON_END: WeekNumber = 14;
pub const PLAYOFF_START: WeekNumber = 15;
pub const LAST_WEEK: WeekNumber = 17;

/// Number of regular-season teams that advance to the playoff table.
pub const QUALIFIER_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of the Sleeper wire format
// ---------------------------------------------------------------------------

/// A fantasy team, keyed by Sleeper's `roster_id`. Unique within a league-season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeagueVariant {
    /// Standard league, top 6 each week.
    #[default]
    Redraft,
    /// Keeper league, top 5 each week.
    Dynasty,
}

impl LeagueVariant {
    pub fn label(&self) -> &'static str {
        match self {
            LeagueVariant::Redraft => "redraft",
            LeagueVariant::Dynasty => "dynasty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redraft" | "standard" => Some(LeagueVariant::Redraft),
            "dynasty" => Some(LeagueVariant::Dynasty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeagueStatus {
    PreDraft,
    Drafting,
    InSeason,
    Complete,
    #[default]
    Unknown,
}

impl LeagueStatus {
    pub fn from_sleeper(raw: &str) -> Self {
        match raw {
            "pre_draft" => LeagueStatus::PreDraft,
            "drafting" => LeagueStatus::Drafting,
            "in_season" => LeagueStatus::InSeason,
            "complete" => LeagueStatus::Complete,
            _ => LeagueStatus::Unknown,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == LeagueStatus::Complete
    }
}

/// One league-season. Sleeper creates a fresh league id every season and
/// links it to the prior one through `previous_league_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct League {
    pub id: String,
    pub name: String,
    pub season: u16,
    pub status: LeagueStatus,
    pub previous_league_id: Option<String>,
}

/// Identity of a loaded season: used for cache entries and to reject
/// responses that belong to a season the user has since navigated away from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonKey {
    pub league_id: String,
    pub season: u16,
    pub variant: LeagueVariant,
}

impl SeasonKey {
    pub fn new(league_id: impl Into<String>, season: u16, variant: LeagueVariant) -> Self {
        Self {
            league_id: league_id.into(),
            season,
            variant,
        }
    }

    /// Storage name, e.g. `fantasy_redraft_2024_1243379119207497728`.
    pub fn cache_name(&self) -> String {
        format!(
            "fantasy_{}_{}_{}",
            self.variant.label(),
            self.season,
            self.league_id
        )
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.season, self.variant.label(), self.league_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub team_id: TeamId,
    pub owner_id: Option<String>, // None = orphaned team
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: Option<String>,
}

/// One team's raw points for one week, as delivered by the source feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMatchupRecord {
    pub team_id: Option<TeamId>,
    pub points: Option<f64>,
}

impl RawMatchupRecord {
    pub fn new(team_id: u32, points: f64) -> Self {
        Self {
            team_id: Some(TeamId(team_id)),
            points: Some(points),
        }
    }
}

/// Derived per (week, team): raw points, MNPS, and the top-performer flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekClassification {
    pub week: WeekNumber,
    pub team_id: TeamId,
    pub points: f64,
    pub score: f64,
    pub is_top: bool,
}

/// All classifications for one week, in source feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedWeek {
    pub week: WeekNumber,
    pub entries: Vec<WeekClassification>,
}

impl ClassifiedWeek {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, team_id: TeamId) -> Option<&WeekClassification> {
        self.entries.iter().find(|e| e.team_id == team_id)
    }

    /// True once any team has put up points, i.e. the week has been played.
    pub fn has_scores(&self) -> bool {
        self.entries.iter().any(|e| e.points > 0.0)
    }
}
