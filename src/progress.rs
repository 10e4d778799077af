//! The persisted gamification state

use crate::aggregator::ActivityLog;
use crate::levels::LevelTable;
use crate::notifications::NotificationQueue;
use achievements::{AchievementState, Catalog, StatSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the engine remembers between sessions.
///
/// Every field defaults, so records written before a field existed load
/// with zeroed stats and locked achievements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressState {
    pub experience: u64,
    pub level: u32,
    pub stats: StatSnapshot,
    pub activity: ActivityLog,
    pub achievements: BTreeMap<String, AchievementState>,
    pub pending_notifications: NotificationQueue,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            experience: 0,
            level: 1,
            stats: StatSnapshot::default(),
            activity: ActivityLog::default(),
            achievements: BTreeMap::new(),
            pending_notifications: NotificationQueue::default(),
        }
    }
}

impl ProgressState {
    /// Fresh state with one locked entry per catalog achievement
    pub fn initial(catalog: &Catalog) -> Self {
        let mut state = Self::default();
        state.normalize(catalog, None);
        state
    }

    /// Reconcile a loaded record with the current catalog and level table.
    ///
    /// Missing entries become locked, entries for retired ids are dropped,
    /// unlocked entries report 100% and the level is recomputed from XP.
    pub fn normalize(&mut self, catalog: &Catalog, levels: Option<&LevelTable>) {
        let mut achievements = BTreeMap::new();
        for definition in catalog.iter() {
            let mut state = self
                .achievements
                .remove(&definition.id)
                .unwrap_or_default();
            if state.unlocked {
                state.progress_percent = 100;
            } else {
                state.unlocked_at = None;
                state.progress_percent =
                    definition.progress_for(self.stats.get(definition.stat_key));
            }
            achievements.insert(definition.id.clone(), state);
        }
        self.achievements = achievements;

        if let Some(levels) = levels {
            self.level = levels.level_for(self.experience).level;
        }
        self.level = self.level.max(1);
    }

    pub fn unlocked_count(&self) -> usize {
        self.achievements.values().filter(|s| s.unlocked).count()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.achievements.get(id).is_some_and(|s| s.unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use achievements::StatKey;

    #[test]
    fn old_records_load_with_defaults() {
        let state: ProgressState =
            serde_json::from_str(r#"{"experience": 60, "stats": {"wordCount": 120}}"#).unwrap();
        assert_eq!(state.experience, 60);
        assert_eq!(state.level, 1);
        assert_eq!(state.stats.get(StatKey::WordCount), 120);
        assert_eq!(state.stats.get(StatKey::EventCount), 0);
        assert!(state.achievements.is_empty());
        assert!(state.pending_notifications.is_empty());
    }

    #[test]
    fn normalize_fills_drops_and_relevels() {
        let catalog = Catalog::standard().unwrap();
        let levels = LevelTable::standard().unwrap();

        let mut state = ProgressState {
            experience: 160,
            level: 1,
            ..ProgressState::default()
        };
        state.stats.set(StatKey::WordCount, 500);
        state
            .achievements
            .insert("writing-1".to_string(), AchievementState::unlocked_at(1));
        state
            .achievements
            .insert("retired".to_string(), AchievementState::unlocked_at(1));

        state.normalize(&catalog, Some(&levels));

        assert_eq!(state.achievements.len(), catalog.len());
        assert!(!state.achievements.contains_key("retired"));
        assert!(state.is_unlocked("writing-1"));
        assert_eq!(state.achievements["writing-3"].progress_percent, 50);
        assert_eq!(state.level, 3);
    }
}
