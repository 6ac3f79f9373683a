use crate::directory::TeamDirectory;
use crate::standings::Standing;
use crate::{
    ClassifiedWeek, FIRST_WEEK, LAST_WEEK, PLAYOFF_START, QUALIFIER_COUNT, REGULAR_SEASON_END,
    TeamId, WeekNumber,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;

// ---------------------------------------------------------------------------
// Week windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekWindow {
    /// Weeks `1..=last`.
    Through(WeekNumber),
    /// Weeks `low..=high`.
    Range { low: WeekNumber, high: WeekNumber },
}

impl WeekWindow {
    pub fn through(last: WeekNumber) -> Self {
        WeekWindow::Through(last)
    }

    pub fn range(low: WeekNumber, high: WeekNumber) -> Self {
        WeekWindow::Range { low, high }
    }

    /// Regular season: weeks 1–14, cut short at `played_through` while the
    /// season is still being played. `Some(0)` gives an empty window.
    pub fn regular_season(played_through: Option<WeekNumber>) -> Self {
        let last = played_through
            .map(|w| w.min(REGULAR_SEASON_END))
            .unwrap_or(REGULAR_SEASON_END);
        WeekWindow::Through(last)
    }

    /// Playoffs: weeks 15–17, cut short at `played_through` like the regular
    /// season. Empty until week 15 has been played.
    pub fn playoffs(played_through: Option<WeekNumber>) -> Self {
        let high = played_through
            .map(|w| w.min(LAST_WEEK))
            .unwrap_or(LAST_WEEK);
        WeekWindow::Range {
            low: PLAYOFF_START,
            high,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weeks().is_empty()
    }

    pub fn contains(&self, week: WeekNumber) -> bool {
        match *self {
            WeekWindow::Through(last) => week >= FIRST_WEEK && week <= last,
            WeekWindow::Range { low, high } => week >= low && week <= high,
        }
    }

    pub fn weeks(&self) -> RangeInclusive<WeekNumber> {
        match *self {
            WeekWindow::Through(last) => FIRST_WEEK..=last,
            WeekWindow::Range { low, high } => low..=high,
        }
    }
}

// ---------------------------------------------------------------------------
// Classified week store
// ---------------------------------------------------------------------------

/// Classified weeks of one season, keyed by week number. Inserting a week
/// that is already present replaces it, so weeks can be re-supplied as they
/// are refetched without ever being counted twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonWeeks {
    weeks: BTreeMap<WeekNumber, ClassifiedWeek>,
}

impl SeasonWeeks {
    pub fn insert(&mut self, week: ClassifiedWeek) -> Option<ClassifiedWeek> {
        self.weeks.insert(week.week, week)
    }

    pub fn get(&self, week: WeekNumber) -> Option<&ClassifiedWeek> {
        self.weeks.get(&week)
    }

    /// Weeks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedWeek> {
        self.weeks.values()
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn clear(&mut self) {
        self.weeks.clear();
    }

    /// The last week in which any team has scored.
    pub fn latest_scored_week(&self) -> Option<WeekNumber> {
        self.weeks
            .values()
            .rev()
            .find(|w| w.has_scores())
            .map(|w| w.week)
    }
}

// ---------------------------------------------------------------------------
// Season records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekCell {
    pub points: f64,
    pub score: f64,
    pub is_top: bool,
}

/// Accumulated totals for one team over a window of weeks. The totals are
/// the exact sum of the cells in `weeks`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRecord {
    pub team_id: TeamId,
    pub total_points: f64,
    pub total_score: f64,
    pub top_count: u32,
    pub games_played: u32,
    pub weeks: BTreeMap<WeekNumber, WeekCell>,
}

impl SeasonRecord {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            total_points: 0.0,
            total_score: 0.0,
            top_count: 0,
            games_played: 0,
            weeks: BTreeMap::new(),
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.total_score / f64::from(self.games_played)
        }
    }

    pub fn week(&self, week: WeekNumber) -> Option<&WeekCell> {
        self.weeks.get(&week)
    }

    /// Raw points for a week; weeks without data read as 0.
    pub fn week_points(&self, week: WeekNumber) -> f64 {
        self.week(week).map(|c| c.points).unwrap_or(0.0)
    }

    fn add(&mut self, week: WeekNumber, cell: WeekCell) {
        self.total_points += cell.points;
        self.total_score += cell.score;
        self.games_played += 1;
        if cell.is_top {
            self.top_count += 1;
        }
        self.weeks.insert(week, cell);
    }
}

/// Per-team records for one window, in first-appearance order
/// (ascending week, then feed order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonAggregate {
    window: Option<WeekWindow>,
    records: Vec<SeasonRecord>,
    index: HashMap<TeamId, usize>,
}

impl SeasonAggregate {
    pub fn window(&self) -> Option<WeekWindow> {
        self.window
    }

    pub fn get(&self, team_id: TeamId) -> Option<&SeasonRecord> {
        self.index.get(&team_id).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeasonRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Join each record with its display name. Names are read from the
    /// directory at call time, so a rebuilt directory shows up without
    /// re-running the fold.
    pub fn standings(&self, directory: &TeamDirectory) -> Vec<Standing> {
        self.records
            .iter()
            .map(|record| Standing {
                team_id: record.team_id,
                name: directory.name(record.team_id).into_owned(),
                record: record.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Folds
// ---------------------------------------------------------------------------

/// Fold every classification inside `window` into per-team records.
///
/// When the same week number appears more than once the last copy wins,
/// so folding overlapping snapshots gives the same result as folding the
/// distinct weeks once.
pub fn aggregate<'a, I>(weeks: I, window: WeekWindow) -> SeasonAggregate
where
    I: IntoIterator<Item = &'a ClassifiedWeek>,
{
    fold(weeks, window, None)
}

/// Top `count` teams of a regular-season aggregate by accumulated MNPS.
/// Equal scores keep first-appearance order.
pub fn qualifiers(regular: &SeasonAggregate, count: usize) -> Vec<TeamId> {
    let mut ranked: Vec<&SeasonRecord> = regular.records.iter().collect();
    ranked.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    ranked.into_iter().take(count).map(|r| r.team_id).collect()
}

/// Playoff-window aggregate restricted to the regular season's qualifiers.
/// Teams outside the top five are left out entirely, playoff records or not.
pub fn aggregate_qualifiers<'a, I>(
    weeks: I,
    regular: &SeasonAggregate,
    window: WeekWindow,
) -> SeasonAggregate
where
    I: IntoIterator<Item = &'a ClassifiedWeek>,
{
    let eligible: HashSet<TeamId> = qualifiers(regular, QUALIFIER_COUNT).into_iter().collect();
    fold(weeks, window, Some(&eligible))
}

/// Highest raw points in a given week, optionally among `eligible` teams
/// only. Strictly greater wins, so the first team in feed order keeps a tie.
pub fn playoff_week_leader<'a, I>(
    weeks: I,
    week: WeekNumber,
    eligible: Option<&[TeamId]>,
) -> Option<TeamId>
where
    I: IntoIterator<Item = &'a ClassifiedWeek>,
{
    let classified = weeks.into_iter().filter(|w| w.week == week).last()?;

    let mut leader: Option<(TeamId, f64)> = None;
    for entry in &classified.entries {
        if eligible.is_some_and(|ids| !ids.contains(&entry.team_id)) {
            continue;
        }
        if leader.is_none_or(|(_, best)| entry.points > best) {
            leader = Some((entry.team_id, entry.points));
        }
    }
    leader.map(|(team_id, _)| team_id)
}

fn fold<'a, I>(weeks: I, window: WeekWindow, eligible: Option<&HashSet<TeamId>>) -> SeasonAggregate
where
    I: IntoIterator<Item = &'a ClassifiedWeek>,
{
    let mut distinct: BTreeMap<WeekNumber, &ClassifiedWeek> = BTreeMap::new();
    for week in weeks {
        if window.contains(week.week) {
            distinct.insert(week.week, week);
        }
    }

    let mut out = SeasonAggregate {
        window: Some(window),
        ..SeasonAggregate::default()
    };

    for (week, classified) in distinct {
        for entry in &classified.entries {
            if eligible.is_some_and(|ids| !ids.contains(&entry.team_id)) {
                continue;
            }
            let slot = match out.index.get(&entry.team_id) {
                Some(&i) => i,
                None => {
                    out.records.push(SeasonRecord::new(entry.team_id));
                    out.index.insert(entry.team_id, out.records.len() - 1);
                    out.records.len() - 1
                }
            };
            out.records[slot].add(
                week,
                WeekCell {
                    points: entry.points,
                    score: entry.score,
                    is_top: entry.is_top,
                },
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawMatchupRecord, Roster, User, build_directory, classify_week};

    const MULT: f64 = 0.0653;
    const EPS: f64 = 1e-9;

    fn week(n: WeekNumber, points: &[(u32, f64)], cutoff: usize) -> ClassifiedWeek {
        let records: Vec<RawMatchupRecord> = points
            .iter()
            .map(|&(id, p)| RawMatchupRecord::new(id, p))
            .collect();
        classify_week(n, &records, MULT, cutoff).week
    }

    /// Six teams, cutoff 1. Ranking by points would drop team 1; ranking by
    /// MNPS drops team 5 instead.
    fn score_vs_points_season() -> Vec<ClassifiedWeek> {
        vec![
            week(1, &[(1, 100.0), (2, 99.0), (3, 98.0), (4, 97.0), (5, 96.0), (6, 95.0)], 1),
            week(2, &[(6, 50.0), (1, 0.0), (2, 48.0), (3, 47.0), (4, 46.0), (5, 45.0)], 1),
            week(15, &[(5, 150.0), (2, 120.0), (3, 120.0), (1, 90.0), (6, 80.0), (4, 70.0)], 1),
            week(16, &[(1, 110.0), (2, 100.0), (5, 200.0)], 1),
        ]
    }

    #[test]
    fn totals_are_sums_of_folded_weeks() {
        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::regular_season(None));

        let t1 = regular.get(TeamId(1)).unwrap();
        assert_eq!(t1.games_played, 2);
        assert_eq!(t1.top_count, 1);
        assert!((t1.total_points - 100.0).abs() < EPS);
        assert!((t1.total_score - (5.0 + 100.0 * MULT)).abs() < EPS);
        assert!((t1.average_score() - t1.total_score / 2.0).abs() < EPS);

        let summed: f64 = t1.weeks.values().map(|c| c.score).sum();
        assert_eq!(summed, t1.total_score);
    }

    #[test]
    fn folding_twice_matches_folding_once() {
        let weeks = score_vs_points_season();
        let mut doubled = weeks.clone();
        doubled.extend(weeks.iter().cloned());

        let once = aggregate(&weeks, WeekWindow::through(17));
        let twice = aggregate(&doubled, WeekWindow::through(17));
        assert_eq!(once, twice);
    }

    #[test]
    fn resupplied_week_replaces_earlier_copy() {
        let mut store = SeasonWeeks::default();
        store.insert(week(1, &[(1, 10.0), (2, 5.0)], 1));
        let before = aggregate(store.iter(), WeekWindow::through(14));
        assert!((before.get(TeamId(1)).unwrap().total_points - 10.0).abs() < EPS);

        let replaced = store.insert(week(1, &[(1, 30.0), (2, 5.0)], 1));
        assert!(replaced.is_some());
        assert_eq!(store.len(), 1);

        let after = aggregate(store.iter(), WeekWindow::through(14));
        let t1 = after.get(TeamId(1)).unwrap();
        assert_eq!(t1.games_played, 1);
        assert!((t1.total_points - 30.0).abs() < EPS);
    }

    #[test]
    fn regular_window_excludes_playoff_weeks() {
        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::through(14));
        for record in regular.iter() {
            assert!(record.weeks.keys().all(|&w| w <= 14));
        }
        assert_eq!(regular.get(TeamId(5)).unwrap().games_played, 2);
    }

    #[test]
    fn regular_window_stops_at_current_week_in_progress() {
        assert_eq!(WeekWindow::regular_season(Some(1)), WeekWindow::Through(1));
        assert_eq!(WeekWindow::regular_season(Some(16)), WeekWindow::Through(14));
        assert_eq!(WeekWindow::regular_season(None).weeks(), 1..=14);
        assert!(!WeekWindow::playoffs(None).contains(14));
        assert!(WeekWindow::playoffs(None).contains(17));
        assert!(WeekWindow::regular_season(Some(0)).is_empty());

        let weeks = score_vs_points_season();
        let partial = aggregate(&weeks, WeekWindow::regular_season(Some(1)));
        assert!(partial.iter().all(|r| r.games_played == 1));
    }

    #[test]
    fn empty_week_changes_nothing() {
        let weeks = score_vs_points_season();
        let mut with_empty = weeks.clone();
        with_empty.push(week(3, &[], 1));

        let base = aggregate(&weeks, WeekWindow::through(14));
        let padded = aggregate(&with_empty, WeekWindow::through(14));
        assert_eq!(base.len(), padded.len());
        for (a, b) in base.iter().zip(padded.iter()) {
            assert_eq!(a.weeks, b.weeks);
            assert_eq!(a.games_played, b.games_played);
        }
        assert!(padded.iter().all(|r| r.week(3).is_none()));
    }

    #[test]
    fn playoff_window_stops_at_played_week() {
        assert!(WeekWindow::playoffs(Some(14)).is_empty());
        assert_eq!(WeekWindow::playoffs(Some(15)).weeks(), 15..=15);
        assert_eq!(WeekWindow::playoffs(Some(20)).weeks(), 15..=17);

        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::regular_season(None));
        let partial = aggregate_qualifiers(&weeks, &regular, WeekWindow::playoffs(Some(15)));
        assert!(partial.iter().all(|r| r.week(16).is_none()));
        assert_eq!(partial.get(TeamId(1)).unwrap().games_played, 1);

        let none_yet = aggregate_qualifiers(&weeks, &regular, WeekWindow::playoffs(Some(2)));
        assert!(none_yet.is_empty());
    }

    #[test]
    fn average_is_zero_without_games() {
        assert_eq!(SeasonRecord::new(TeamId(1)).average_score(), 0.0);
    }

    #[test]
    fn qualifiers_rank_by_score_not_points() {
        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::regular_season(None));
        let q = qualifiers(&regular, QUALIFIER_COUNT);
        assert_eq!(q, vec![TeamId(6), TeamId(1), TeamId(2), TeamId(3), TeamId(4)]);
    }

    #[test]
    fn qualifiers_shrink_for_small_leagues() {
        let weeks = vec![week(1, &[(1, 10.0), (2, 20.0), (3, 30.0)], 1)];
        let regular = aggregate(&weeks, WeekWindow::through(14));
        assert_eq!(qualifiers(&regular, QUALIFIER_COUNT).len(), 3);
    }

    #[test]
    fn playoff_aggregate_drops_non_qualifiers() {
        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::regular_season(None));
        let playoffs = aggregate_qualifiers(&weeks, &regular, WeekWindow::playoffs(None));

        assert!(playoffs.get(TeamId(5)).is_none());
        assert_eq!(playoffs.len(), 5);
        let t1 = playoffs.get(TeamId(1)).unwrap();
        assert_eq!(t1.games_played, 2);
        assert!((t1.total_points - 200.0).abs() < EPS);
        assert!(t1.weeks.keys().all(|&w| (15..=17).contains(&w)));
    }

    #[test]
    fn week_leader_first_encountered_wins_ties() {
        let weeks = score_vs_points_season();
        let regular = aggregate(&weeks, WeekWindow::regular_season(None));
        let eligible = qualifiers(&regular, QUALIFIER_COUNT);

        assert_eq!(playoff_week_leader(&weeks, 15, None), Some(TeamId(5)));
        assert_eq!(playoff_week_leader(&weeks, 15, Some(&eligible)), Some(TeamId(2)));
        assert_eq!(playoff_week_leader(&weeks, 17, Some(&eligible)), None);
    }

    #[test]
    fn names_resolve_at_read_time() {
        let weeks = vec![week(1, &[(1, 10.0), (2, 20.0)], 1)];
        let regular = aggregate(&weeks, WeekWindow::through(14));

        let empty = TeamDirectory::default();
        let rows = regular.standings(&empty);
        assert_eq!(rows[0].name, "Team 1");

        let rebuilt = build_directory(
            &[Roster {
                team_id: TeamId(1),
                owner_id: Some("u1".into()),
            }],
            &[User {
                user_id: "u1".into(),
                display_name: Some("Renamed".into()),
            }],
        );
        let rows = regular.standings(&rebuilt);
        assert_eq!(rows[0].name, "Renamed");
        assert_eq!(rows[1].name, "Team 2");
    }

    #[test]
    fn latest_scored_week_skips_unplayed() {
        let mut store = SeasonWeeks::default();
        store.insert(week(1, &[(1, 10.0)], 1));
        store.insert(week(2, &[(1, 12.0)], 1));
        store.insert(week(3, &[(1, 0.0), (2, 0.0)], 1));
        assert_eq!(store.latest_scored_week(), Some(2));
    }
}
