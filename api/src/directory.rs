use crate::{Roster, TeamId, User};
use std::borrow::Cow;
use std::collections::HashMap;

/// Roster id → display name for one league-season.
///
/// Built wholesale from the roster and user lists; never patched in place.
/// Lookups always produce a non-empty name: teams without an owner record,
/// and ids that never appeared in the roster list, read as `Team <id>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamDirectory {
    names: HashMap<TeamId, String>,
}

impl TeamDirectory {
    pub fn name(&self, team_id: TeamId) -> Cow<'_, str> {
        match self.names.get(&team_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(synthetic_name(team_id)),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn synthetic_name(team_id: TeamId) -> String {
    format!("Team {team_id}")
}

/// Map every roster to its owner's display name, falling back to
/// `Team <id>` when the owner is missing or has an empty name.
pub fn build_directory(rosters: &[Roster], users: &[User]) -> TeamDirectory {
    let by_user: HashMap<&str, &User> = users.iter().map(|u| (u.user_id.as_str(), u)).collect();

    let names = rosters
        .iter()
        .map(|roster| {
            let name = roster
                .owner_id
                .as_deref()
                .and_then(|owner| by_user.get(owner))
                .and_then(|user| user.display_name.as_deref())
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .unwrap_or_else(|| synthetic_name(roster.team_id));
            (roster.team_id, name)
        })
        .collect();

    TeamDirectory { names }
}
