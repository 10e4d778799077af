//! XP and Level system
//!
//! Maps cumulative experience onto levels through a threshold table.

use error::{GamificationError, GamificationResult};
use serde::{Deserialize, Serialize};

/// One row of the level table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub level: u32,
    pub xp_required: u64,
    pub title: String,
    #[serde(default)]
    pub unlocked_features: Vec<String>,
}

impl LevelThreshold {
    pub fn new(level: u32, xp_required: u64, title: &str, unlocked_features: &[&str]) -> Self {
        Self {
            level,
            xp_required,
            title: title.to_string(),
            unlocked_features: unlocked_features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Result of placing an experience total on the level table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub experience: u64,
    pub level: u32,
    pub title: String,
    /// 0.0 - 100.0; 100.0 at the maximum level
    pub percent_to_next_level: f64,
    /// XP at which the next level starts (None if max)
    pub next_level_xp: Option<u64>,
    pub previous_level: u32,
    pub leveled_up: bool,
}

impl LevelProgress {
    pub fn is_max_level(&self) -> bool {
        self.next_level_xp.is_none()
    }

    /// XP still missing for the next level
    pub fn xp_to_next(&self) -> Option<u64> {
        self.next_level_xp
            .map(|next| next.saturating_sub(self.experience))
    }
}

/// Level definitions, sorted by level with strictly increasing XP requirements
#[derive(Debug, Clone)]
pub struct LevelTable {
    levels: Vec<LevelThreshold>,
}

impl LevelTable {
    pub fn new(levels: Vec<LevelThreshold>) -> GamificationResult<Self> {
        let Some(first) = levels.first() else {
            return Err(GamificationError::CatalogIntegrity(
                "level table is empty".to_string(),
            ));
        };
        if first.xp_required != 0 {
            return Err(GamificationError::CatalogIntegrity(format!(
                "level 1 must require 0 XP, found {}",
                first.xp_required
            )));
        }

        for (index, row) in levels.iter().enumerate() {
            if row.level as usize != index + 1 {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "level at position {} is numbered {}",
                    index, row.level
                )));
            }
            if index > 0 && row.xp_required <= levels[index - 1].xp_required {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "level {} requires {} XP, not more than level {}",
                    row.level,
                    row.xp_required,
                    row.level - 1
                )));
            }
        }

        Ok(Self { levels })
    }

    /// The built-in table
    pub fn standard() -> GamificationResult<Self> {
        Self::new(vec![
            LevelThreshold::new(1, 0, "Scribbler", &["editor", "markdown-preview"]),
            LevelThreshold::new(2, 50, "Apprentice", &["custom-themes"]),
            LevelThreshold::new(3, 150, "Storyteller", &["export-txt"]),
            LevelThreshold::new(4, 300, "Wordsmith", &["export-html"]),
            LevelThreshold::new(5, 500, "Chronicler", &["world-atlas"]),
            LevelThreshold::new(6, 800, "Author", &["export-pdf"]),
            LevelThreshold::new(7, 1_200, "Novelist", &["timeline-view"]),
            LevelThreshold::new(8, 1_700, "Loremaster", &["profile-banner"]),
            LevelThreshold::new(9, 2_300, "Worldbuilder", &["custom-fonts"]),
            LevelThreshold::new(10, 3_000, "Bard", &[]),
            LevelThreshold::new(11, 4_000, "Sage", &[]),
            LevelThreshold::new(12, 5_500, "Living Legend", &["golden-quill"]),
        ])
    }

    /// Highest level whose requirement is met by `experience`
    pub fn level_for(&self, experience: u64) -> &LevelThreshold {
        self.levels
            .iter()
            .rev()
            .find(|l| experience >= l.xp_required)
            .unwrap_or(&self.levels[0])
    }

    pub fn threshold(&self, level: u32) -> Option<&LevelThreshold> {
        (level as usize)
            .checked_sub(1)
            .and_then(|index| self.levels.get(index))
    }

    pub fn max_level(&self) -> u32 {
        self.levels.last().map(|l| l.level).unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelThreshold> {
        self.levels.iter()
    }

    /// Every feature unlocked at or below `level`
    pub fn features_up_to(&self, level: u32) -> Vec<&str> {
        self.levels
            .iter()
            .take_while(|l| l.level <= level)
            .flat_map(|l| l.unlocked_features.iter().map(String::as_str))
            .collect()
    }

    /// Features unlocked by going from `from` (exclusive) to `to` (inclusive)
    pub fn features_between(&self, from: u32, to: u32) -> Vec<String> {
        self.levels
            .iter()
            .filter(|l| l.level > from && l.level <= to)
            .flat_map(|l| l.unlocked_features.iter().cloned())
            .collect()
    }

    /// Place `experience` on the table; `previous_level` feeds level-up detection
    pub fn progress(&self, experience: u64, previous_level: u32) -> LevelProgress {
        let current = self.level_for(experience);
        let next = self.threshold(current.level + 1);

        let percent_to_next_level = match next {
            Some(next) => {
                let span = (next.xp_required - current.xp_required) as f64;
                let gained = (experience - current.xp_required) as f64;
                (100.0 * gained / span).clamp(0.0, 100.0)
            }
            None => 100.0,
        };

        LevelProgress {
            experience,
            level: current.level,
            title: current.title.clone(),
            percent_to_next_level,
            next_level_xp: next.map(|n| n.xp_required),
            previous_level,
            leveled_up: current.level > previous_level,
        }
    }

    /// Add a non-negative delta to `current_experience`
    pub fn apply_experience(
        &self,
        current_experience: u64,
        delta: i64,
    ) -> GamificationResult<LevelProgress> {
        if delta < 0 {
            return Err(GamificationError::NegativeExperience(delta));
        }
        Ok(self.advance(current_experience, delta as u64))
    }

    pub(crate) fn advance(&self, current_experience: u64, delta: u64) -> LevelProgress {
        let previous_level = self.level_for(current_experience).level;
        self.progress(current_experience.saturating_add(delta), previous_level)
    }
}
