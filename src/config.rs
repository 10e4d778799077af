//! Engine configuration loaded from TOML

use crate::aggregator::DayPolicy;
use error::{GamificationError, GamificationResult};
use save::SaveFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a calendar day starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// Local midnight of the machine running the engine
    #[default]
    Local,
    /// UTC midnight
    Utc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub day_boundary: DayBoundary,
    /// Missed days tolerated before a write streak breaks
    pub streak_grace_days: u32,
    /// Value a broken streak drops to (0 or 1)
    pub streak_reset_value: u64,
    pub save_dir: PathBuf,
    pub save_format: SaveFormat,
    /// Replaces the built-in achievement catalog when set
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            day_boundary: DayBoundary::Local,
            streak_grace_days: 0,
            streak_reset_value: 0,
            save_dir: Self::default_save_dir(),
            save_format: SaveFormat::Json,
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    /// `<data dir>/quill_quest`, or `./saves` when the platform has no data dir
    pub fn default_save_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("quill_quest"))
            .unwrap_or_else(|| PathBuf::from("saves"))
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> GamificationResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            GamificationError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> GamificationResult<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| GamificationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GamificationResult<()> {
        if self.streak_reset_value > 1 {
            return Err(GamificationError::Config(format!(
                "streak_reset_value must be 0 or 1, got {}",
                self.streak_reset_value
            )));
        }
        Ok(())
    }

    pub fn day_policy(&self) -> DayPolicy {
        DayPolicy {
            boundary: self.day_boundary,
            grace_days: self.streak_grace_days,
            reset_value: self.streak_reset_value,
        }
    }
}
