//! Validated, ordered set of achievement definitions

use crate::achievement::{AchievementCategory, AchievementDefinition, all_achievements};
use error::{GamificationError, GamificationResult};
use serde::Deserialize;
use std::collections::HashMap;

/// The achievement catalog.
///
/// Declaration order is preserved and drives unlock (and therefore
/// notification) order when several achievements unlock together.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<AchievementDefinition>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    achievement: Vec<AchievementDefinition>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or empty ids and zero rewards or thresholds
    pub fn new(definitions: Vec<AchievementDefinition>) -> GamificationResult<Self> {
        let mut index = HashMap::with_capacity(definitions.len());

        for (position, definition) in definitions.iter().enumerate() {
            if definition.id.trim().is_empty() {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "achievement #{} has an empty id",
                    position
                )));
            }
            if definition.xp == 0 {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "achievement {} awards no experience",
                    definition.id
                )));
            }
            if definition.threshold == 0 {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "achievement {} has a zero threshold",
                    definition.id
                )));
            }
            if index.insert(definition.id.clone(), position).is_some() {
                return Err(GamificationError::CatalogIntegrity(format!(
                    "duplicate achievement id {}",
                    definition.id
                )));
            }
        }

        Ok(Self { definitions, index })
    }

    /// The built-in catalog
    pub fn standard() -> GamificationResult<Self> {
        Self::new(all_achievements())
    }

    /// Parse a catalog from `[[achievement]]` TOML tables
    pub fn from_toml_str(source: &str) -> GamificationResult<Self> {
        let file: CatalogFile = toml::from_str(source)
            .map_err(|e| GamificationError::CatalogIntegrity(e.to_string()))?;
        Self::new(file.achievement)
    }

    pub fn get(&self, id: &str) -> GamificationResult<&AchievementDefinition> {
        self.index
            .get(id)
            .map(|&position| &self.definitions[position])
            .ok_or_else(|| GamificationError::UnknownAchievement(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    pub fn by_category(
        &self,
        category: AchievementCategory,
    ) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.category == category)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Experience available if every achievement were unlocked
    pub fn total_xp(&self) -> u64 {
        self.definitions.iter().map(|d| d.xp as u64).sum()
    }
}
