use crate::aggregate::SeasonRecord;
use crate::{TeamId, WeekNumber};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    TotalPoints,
    TotalScore,
    TopCount,
    GamesPlayed,
    AverageScore,
    WeekPoints(WeekNumber),
}

impl SortKey {
    pub fn label(&self) -> String {
        match self {
            SortKey::Name => "Team".to_string(),
            SortKey::TotalPoints => "Points".to_string(),
            SortKey::TotalScore => "MNPS".to_string(),
            SortKey::TopCount => "Top".to_string(),
            SortKey::GamesPlayed => "GP".to_string(),
            SortKey::AverageScore => "Avg".to_string(),
            SortKey::WeekPoints(week) => format!("W{week}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::TotalScore,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Selecting the active key flips its direction; any other key starts
    /// out descending.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self {
                key,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                key,
                direction: SortDirection::Descending,
            }
        }
    }
}

/// One display row: a season record joined with its team name.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub team_id: TeamId,
    pub name: String,
    pub record: SeasonRecord,
}

/// Order rows by `spec`. The sort is stable: rows with equal keys keep the
/// order they came in.
pub fn sort_standings(rows: &[Standing], spec: SortSpec) -> Vec<Standing> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare(a, b, spec.key);
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    sorted
}

fn compare(a: &Standing, b: &Standing, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::TotalPoints => a.record.total_points.total_cmp(&b.record.total_points),
        SortKey::TotalScore => a.record.total_score.total_cmp(&b.record.total_score),
        SortKey::TopCount => a.record.top_count.cmp(&b.record.top_count),
        SortKey::GamesPlayed => a.record.games_played.cmp(&b.record.games_played),
        SortKey::AverageScore => a.record.average_score().total_cmp(&b.record.average_score()),
        SortKey::WeekPoints(week) => a
            .record
            .week_points(week)
            .total_cmp(&b.record.week_points(week)),
    }
}
