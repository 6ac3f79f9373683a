/// Sleeper API raw wire types: serde shapes for deserializing responses.
/// These map to our clean domain types via the mapping functions in client.rs.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// League  (GET /league/{league_id})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SleeperLeague {
    pub league_id: Option<String>,
    pub name: Option<String>,
    pub season: Option<String>, // "2024"
    pub status: Option<String>, // pre_draft | drafting | in_season | complete
    /// "0" or null for the first season of a league.
    pub previous_league_id: Option<String>,
    pub total_rosters: Option<u32>,
}

// ---------------------------------------------------------------------------
// Rosters and users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SleeperRoster {
    pub roster_id: Option<u32>,
    pub owner_id: Option<String>, // null for orphaned teams
    pub league_id: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SleeperUser {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Matchups  (GET /league/{league_id}/matchups/{week})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SleeperMatchup {
    pub roster_id: Option<u32>,
    pub matchup_id: Option<u32>,
    /// null before kickoff on some leagues
    pub points: Option<f64>,
}
