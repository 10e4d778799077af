//! Achievement rule evaluation

use crate::achievement::{AchievementDefinition, AchievementState};
use crate::catalog::Catalog;
use crate::stats::StatSnapshot;
use std::collections::BTreeMap;

/// Outcome of one evaluation pass
#[derive(Debug, Clone)]
pub struct Evaluation<'c> {
    /// Achievements unlocked by this pass, in catalog order
    pub newly_unlocked: Vec<&'c AchievementDefinition>,
    /// State for every catalog entry after the pass
    pub updated_states: BTreeMap<String, AchievementState>,
}

impl Evaluation<'_> {
    /// Sum of the rewards of everything unlocked in this pass
    pub fn xp_awarded(&self) -> u64 {
        self.newly_unlocked.iter().map(|d| d.xp as u64).sum()
    }

    pub fn unlocked_ids(&self) -> Vec<&str> {
        self.newly_unlocked.iter().map(|d| d.id.as_str()).collect()
    }
}

/// Evaluate every locked achievement against `stats`.
///
/// Already-unlocked entries are carried over untouched and never re-enter
/// `newly_unlocked`. States for ids missing from the catalog are dropped.
pub fn evaluate<'c>(
    stats: &StatSnapshot,
    states: &BTreeMap<String, AchievementState>,
    catalog: &'c Catalog,
    now_ms: i64,
) -> Evaluation<'c> {
    let mut newly_unlocked = Vec::new();
    let mut updated_states = BTreeMap::new();

    for definition in catalog.iter() {
        if let Some(state) = states.get(&definition.id).filter(|s| s.unlocked) {
            updated_states.insert(definition.id.clone(), state.clone());
            continue;
        }

        let value = stats.get(definition.stat_key);
        let state = if definition.is_satisfied_by(value) {
            newly_unlocked.push(definition);
            AchievementState::unlocked_at(now_ms)
        } else {
            AchievementState {
                unlocked: false,
                unlocked_at: None,
                progress_percent: definition.progress_for(value),
            }
        };
        updated_states.insert(definition.id.clone(), state);
    }

    Evaluation {
        newly_unlocked,
        updated_states,
    }
}
