use crate::directory::{TeamDirectory, build_directory};
use crate::sleeper::{SleeperLeague, SleeperMatchup, SleeperRoster, SleeperUser};
use crate::{League, LeagueStatus, RawMatchupRecord, Roster, TeamId, User, WeekNumber};
use chrono::{DateTime, Datelike, Utc};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const SLEEPER_V1: &str = "https://api.sleeper.app/v1";

/// Upper bound on how far back `fetch_league_history` follows
/// `previous_league_id` links.
const MAX_HISTORY: usize = 10;

/// Sleeper API client.
#[derive(Debug, Clone)]
pub struct SleeperApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for SleeperApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("mnps/0.2 (terminal fantasy dashboard)")
                .build()
                .unwrap_or_default(),
            base_url: SLEEPER_V1.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Every variant means the source could not supply the data; callers treat
/// them alike and only use the variant for the message.
#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl SleeperApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Fetch league metadata. Sleeper answers unknown ids with `null`.
    pub async fn fetch_league(&self, league_id: &str) -> ApiResult<League> {
        let url = format!("{}/league/{league_id}", self.base_url);
        let raw: Option<SleeperLeague> = self.get(&url).await?;
        let raw = raw.ok_or_else(|| ApiError::NotFound(format!("league {league_id}")))?;
        Ok(map_league(raw, league_id))
    }

    /// The league and its prior seasons, newest first, following
    /// `previous_league_id`. Only the first lookup is required to succeed;
    /// a broken link further back ends the walk.
    pub async fn fetch_league_history(&self, league_id: &str) -> ApiResult<Vec<League>> {
        let newest = self.fetch_league(league_id).await?;
        let mut seen: HashSet<String> = HashSet::from([newest.id.clone()]);
        let mut next = newest.previous_league_id.clone();
        let mut history = vec![newest];

        while let Some(prev_id) = next.take() {
            if history.len() >= MAX_HISTORY || !seen.insert(prev_id.clone()) {
                break;
            }
            match self.fetch_league(&prev_id).await {
                Ok(league) => {
                    next = league.previous_league_id.clone();
                    history.push(league);
                }
                Err(e) => {
                    warn!("stopping league history walk at {prev_id}: {e}");
                    break;
                }
            }
        }

        debug!("league {league_id}: {} season(s) of history", history.len());
        Ok(history)
    }

    pub async fn fetch_rosters(&self, league_id: &str) -> ApiResult<Vec<Roster>> {
        let url = format!("{}/league/{league_id}/rosters", self.base_url);
        let raw: Vec<SleeperRoster> = self.get(&url).await?;
        Ok(map_rosters(raw))
    }

    pub async fn fetch_users(&self, league_id: &str) -> ApiResult<Vec<User>> {
        let url = format!("{}/league/{league_id}/users", self.base_url);
        let raw: Vec<SleeperUser> = self.get(&url).await?;
        Ok(map_users(raw))
    }

    /// Rosters and users for one league. Fails as a whole if either is
    /// unavailable; there is no partial result.
    pub async fn fetch_directory_sources(
        &self,
        league_id: &str,
    ) -> ApiResult<(Vec<Roster>, Vec<User>)> {
        let rosters = self.fetch_rosters(league_id).await?;
        let users = self.fetch_users(league_id).await?;
        Ok((rosters, users))
    }

    pub async fn fetch_directory(&self, league_id: &str) -> ApiResult<TeamDirectory> {
        let (rosters, users) = self.fetch_directory_sources(league_id).await?;
        Ok(build_directory(&rosters, &users))
    }

    /// Raw matchup records for one week. Weeks Sleeper does not know about
    /// (404 or `null`) come back empty.
    pub async fn fetch_week(
        &self,
        league_id: &str,
        week: WeekNumber,
    ) -> ApiResult<Vec<RawMatchupRecord>> {
        let url = format!("{}/league/{league_id}/matchups/{week}", self.base_url);
        let raw = match self.get::<Option<Vec<SleeperMatchup>>>(&url).await {
            Ok(raw) => raw.unwrap_or_default(),
            Err(ApiError::NotFound(_)) => {
                debug!("week {week} not available for league {league_id}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Ok(map_matchups(raw))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.to_owned()));
        }

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: Sleeper wire types → clean domain types
// ---------------------------------------------------------------------------

fn map_league(raw: SleeperLeague, requested_id: &str) -> League {
    let season = raw
        .season
        .as_deref()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or_else(|| current_nfl_season(Utc::now()));
    let previous_league_id = raw
        .previous_league_id
        .filter(|id| !id.is_empty() && id != "0");

    League {
        id: raw.league_id.unwrap_or_else(|| requested_id.to_string()),
        name: raw.name.unwrap_or_else(|| "Sleeper League".to_string()),
        season,
        status: raw
            .status
            .as_deref()
            .map(LeagueStatus::from_sleeper)
            .unwrap_or_default(),
        previous_league_id,
    }
}

fn map_rosters(raw: Vec<SleeperRoster>) -> Vec<Roster> {
    raw.into_iter()
        .filter_map(|r| {
            let Some(roster_id) = r.roster_id else {
                warn!("skipping roster without roster_id (owner {:?})", r.owner_id);
                return None;
            };
            Some(Roster {
                team_id: TeamId(roster_id),
                owner_id: r.owner_id.filter(|id| !id.is_empty()),
            })
        })
        .collect()
}

fn map_users(raw: Vec<SleeperUser>) -> Vec<User> {
    raw.into_iter()
        .filter_map(|u| {
            Some(User {
                user_id: u.user_id?,
                display_name: u.display_name,
            })
        })
        .collect()
}

/// Records without a roster id are kept as-is; the classifier reports them.
fn map_matchups(raw: Vec<SleeperMatchup>) -> Vec<RawMatchupRecord> {
    raw.into_iter()
        .map(|m| RawMatchupRecord {
            team_id: m.roster_id.map(TeamId),
            points: m.points,
        })
        .collect()
}

/// NFL season year for a date: January and February still belong to the
/// season that kicked off the previous September.
pub fn current_nfl_season(now: DateTime<Utc>) -> u16 {
    let year = if now.month() <= 2 { now.year() - 1 } else { now.year() };
    u16::try_from(year).unwrap_or(u16::MAX)
}
