use crate::policy::TOP_BONUS;
use crate::{ClassifiedWeek, RawMatchupRecord, TeamId, WeekClassification, WeekNumber};
use std::collections::HashSet;
use std::fmt;

/// A matchup record that could not be classified. The record is dropped and
/// the rest of the week is classified without it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    MissingTeamId {
        week: WeekNumber,
        index: usize,
    },
    InvalidPoints {
        week: WeekNumber,
        index: usize,
        team_id: TeamId,
        points: f64,
    },
    DuplicateTeam {
        week: WeekNumber,
        index: usize,
        team_id: TeamId,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingTeamId { week, index } => {
                write!(f, "week {week}: record #{index} has no roster id")
            }
            RecordError::InvalidPoints {
                week,
                index,
                team_id,
                points,
            } => write!(
                f,
                "week {week}: record #{index} (team {team_id}) has unusable points {points}"
            ),
            RecordError::DuplicateTeam {
                week,
                index,
                team_id,
            } => write!(
                f,
                "week {week}: record #{index} repeats team {team_id}"
            ),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekOutcome {
    pub week: ClassifiedWeek,
    pub rejected: Vec<RecordError>,
}

pub fn derived_score(points: f64, multiplier: f64, is_top: bool) -> f64 {
    if is_top {
        TOP_BONUS + points * multiplier
    } else {
        points * multiplier
    }
}

/// Classify one week of matchup records.
///
/// Missing points count as 0. Records are ranked by points, highest first;
/// equal points keep their feed order, so the earlier record wins the last
/// top slot. The first `min(top_cutoff, n)` ranked records are flagged top.
/// Output entries follow feed order. A week without records yields no entries.
pub fn classify_week(
    week: WeekNumber,
    records: &[RawMatchupRecord],
    multiplier: f64,
    top_cutoff: usize,
) -> WeekOutcome {
    let mut rejected = Vec::new();
    let mut seen = HashSet::with_capacity(records.len());
    let mut valid: Vec<(TeamId, f64)> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let Some(team_id) = record.team_id else {
            rejected.push(RecordError::MissingTeamId { week, index });
            continue;
        };
        let points = record.points.unwrap_or(0.0);
        if !points.is_finite() {
            rejected.push(RecordError::InvalidPoints {
                week,
                index,
                team_id,
                points,
            });
            continue;
        }
        if !seen.insert(team_id) {
            rejected.push(RecordError::DuplicateTeam {
                week,
                index,
                team_id,
            });
            continue;
        }
        valid.push((team_id, points));
    }

    // Stable sort: ties keep feed order.
    let mut ranked: Vec<usize> = (0..valid.len()).collect();
    ranked.sort_by(|&a, &b| valid[b].1.total_cmp(&valid[a].1));

    let mut is_top = vec![false; valid.len()];
    for &idx in ranked.iter().take(top_cutoff.min(valid.len())) {
        is_top[idx] = true;
    }

    let entries = valid
        .into_iter()
        .zip(is_top)
        .map(|((team_id, points), is_top)| WeekClassification {
            week,
            team_id,
            points,
            score: derived_score(points, multiplier, is_top),
            is_top,
        })
        .collect();

    WeekOutcome {
        week: ClassifiedWeek { week, entries },
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplier_for_season;

    const EPS: f64 = 1e-9;

    fn twelve_team_week() -> Vec<RawMatchupRecord> {
        [120.0, 110.0, 100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| RawMatchupRecord::new(i as u32 + 1, p))
            .collect()
    }

    fn top_ids(outcome: &WeekOutcome) -> Vec<u32> {
        outcome
            .week
            .entries
            .iter()
            .filter(|e| e.is_top)
            .map(|e| e.team_id.0)
            .collect()
    }

    #[test]
    fn twelve_team_week_flags_top_six() {
        let outcome = classify_week(1, &twelve_team_week(), 0.0653, 6);
        assert!(outcome.rejected.is_empty());
        assert_eq!(top_ids(&outcome), vec![1, 2, 3, 4, 5, 6]);

        let first = outcome.week.get(TeamId(1)).unwrap();
        assert!((first.score - 12.836).abs() < EPS);
        let seventh = outcome.week.get(TeamId(7)).unwrap();
        assert!(!seventh.is_top);
        assert!((seventh.score - 3.918).abs() < EPS);
    }

    #[test]
    fn flagged_count_is_min_of_cutoff_and_records() {
        let all = twelve_team_week();
        for n in 1..=all.len() {
            for cutoff in [5, 6] {
                let outcome = classify_week(3, &all[..n], 0.082, cutoff);
                assert_eq!(top_ids(&outcome).len(), cutoff.min(n), "n={n} cutoff={cutoff}");
            }
        }
    }

    #[test]
    fn score_formula_holds_for_every_entry() {
        let multiplier = 0.0653;
        let outcome = classify_week(2, &twelve_team_week(), multiplier, 6);
        for e in &outcome.week.entries {
            let bonus = if e.is_top { 5.0 } else { 0.0 };
            assert_eq!(e.score, bonus + e.points * multiplier);
        }
    }

    #[test]
    fn dynasty_cutoff_flags_five() {
        let outcome = classify_week(1, &twelve_team_week(), 0.0653, 5);
        assert_eq!(top_ids(&outcome), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_week_yields_no_entries() {
        let outcome = classify_week(9, &[], 0.0653, 6);
        assert!(outcome.week.is_empty());
        assert_eq!(outcome.week.week, 9);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn ties_go_to_earlier_feed_position() {
        // Roster 9 appears before roster 2 with the same points at the cutoff edge.
        let records = vec![
            RawMatchupRecord::new(1, 100.0),
            RawMatchupRecord::new(9, 80.0),
            RawMatchupRecord::new(2, 80.0),
            RawMatchupRecord::new(3, 50.0),
        ];
        let outcome = classify_week(1, &records, 0.0653, 2);
        assert_eq!(top_ids(&outcome), vec![1, 9]);
    }

    #[test]
    fn output_keeps_feed_order() {
        let records = vec![
            RawMatchupRecord::new(4, 10.0),
            RawMatchupRecord::new(2, 90.0),
            RawMatchupRecord::new(7, 50.0),
        ];
        let outcome = classify_week(1, &records, 0.0653, 1);
        let ids: Vec<u32> = outcome.week.entries.iter().map(|e| e.team_id.0).collect();
        assert_eq!(ids, vec![4, 2, 7]);
    }

    #[test]
    fn null_points_rank_as_zero() {
        let records = vec![
            RawMatchupRecord {
                team_id: Some(TeamId(1)),
                points: None,
            },
            RawMatchupRecord::new(2, 0.5),
            RawMatchupRecord::new(3, 100.0),
        ];
        let outcome = classify_week(1, &records, 0.0653, 2);
        assert_eq!(top_ids(&outcome), vec![2, 3]);
        let nulled = outcome.week.get(TeamId(1)).unwrap();
        assert_eq!(nulled.points, 0.0);
        assert_eq!(nulled.score, 0.0);
    }

    #[test]
    fn malformed_records_are_dropped_without_shrinking_the_cutoff() {
        let mut records = twelve_team_week();
        records.insert(
            0,
            RawMatchupRecord {
                team_id: None,
                points: Some(500.0),
            },
        );
        records.push(RawMatchupRecord::new(3, 999.0));
        records.push(RawMatchupRecord {
            team_id: Some(TeamId(13)),
            points: Some(f64::NAN),
        });

        let outcome = classify_week(4, &records, 0.0653, 6);
        assert_eq!(outcome.week.entries.len(), 12);
        assert_eq!(top_ids(&outcome), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(outcome.rejected.len(), 3);
        assert_eq!(
            outcome.rejected[0],
            RecordError::MissingTeamId { week: 4, index: 0 }
        );
        assert_eq!(
            outcome.rejected[1],
            RecordError::DuplicateTeam {
                week: 4,
                index: 13,
                team_id: TeamId(3)
            }
        );
        assert!(outcome.rejected[2].to_string().contains("team 13"));
    }

    #[test]
    fn same_points_score_differently_across_multiplier_change() {
        let records = vec![RawMatchupRecord::new(1, 100.0), RawMatchupRecord::new(2, 50.0)];
        let old = classify_week(1, &records, multiplier_for_season(2022), 1);
        let new = classify_week(1, &records, multiplier_for_season(2024), 1);

        let old_low = old.week.get(TeamId(2)).unwrap().score;
        let new_low = new.week.get(TeamId(2)).unwrap().score;
        assert!((old_low - 4.1).abs() < EPS);
        assert!((new_low - 3.265).abs() < EPS);
        assert_ne!(old.week.get(TeamId(1)).unwrap().score, new.week.get(TeamId(1)).unwrap().score);
    }
}
