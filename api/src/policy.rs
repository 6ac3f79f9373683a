use crate::LeagueVariant;

/// Flat bonus added to a top performer's derived score.
pub const TOP_BONUS: f64 = 5.0;

/// First season scored with the reduced multiplier.
pub const MULTIPLIER_CHANGE_SEASON: u16 = 2024;

const MULTIPLIER_CURRENT: f64 = 0.0653;
const MULTIPLIER_LEGACY: f64 = 0.082;

/// Points-to-MNPS multiplier for a season. Fixed for the whole season.
pub fn multiplier_for_season(season: u16) -> f64 {
    if season >= MULTIPLIER_CHANGE_SEASON {
        MULTIPLIER_CURRENT
    } else {
        MULTIPLIER_LEGACY
    }
}

impl LeagueVariant {
    /// How many teams are flagged as top performers each week.
    pub fn top_cutoff(&self) -> usize {
        match self {
            LeagueVariant::Redraft => 6,
            LeagueVariant::Dynasty => 5,
        }
    }

    /// Column header used for the top-performer count, e.g. "Top 6s".
    pub fn top_label(&self) -> String {
        format!("Top {}s", self.top_cutoff())
    }
}
