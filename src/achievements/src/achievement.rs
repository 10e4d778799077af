//! Achievement definitions and types

use crate::stats::StatKey;
use error::GamificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grouping used by listing and filtering screens
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Writing,
    Character,
    World,
    Commitment,
    Milestone,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 5] = [
        AchievementCategory::Writing,
        AchievementCategory::Character,
        AchievementCategory::World,
        AchievementCategory::Commitment,
        AchievementCategory::Milestone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Writing => "writing",
            AchievementCategory::Character => "character",
            AchievementCategory::World => "world",
            AchievementCategory::Commitment => "commitment",
            AchievementCategory::Milestone => "milestone",
        }
    }
}

impl fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AchievementCategory {
    type Err = GamificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GamificationError::InvalidInput(format!("unknown category {}", s)))
    }
}

/// An immutable achievement definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: AchievementCategory,
    /// Experience awarded once, on unlock
    pub xp: u32,
    #[serde(rename = "stat")]
    pub stat_key: StatKey,
    pub threshold: u64,
}

impl AchievementDefinition {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        category: AchievementCategory,
        xp: u32,
        stat_key: StatKey,
        threshold: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            category,
            xp,
            stat_key,
            threshold,
        }
    }

    /// `min(100, floor(100 * value / threshold))`
    pub fn progress_for(&self, value: u64) -> u8 {
        if self.threshold == 0 {
            return 100;
        }
        let percent = (value as u128 * 100) / self.threshold as u128;
        percent.min(100) as u8
    }

    pub fn is_satisfied_by(&self, value: u64) -> bool {
        value >= self.threshold
    }
}

/// Mutable per-achievement state, keyed by definition id
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(default, rename_all = "camelCase")]
pub struct AchievementState {
    pub unlocked: bool,
    /// Unix epoch milliseconds
    pub unlocked_at: Option<i64>,
    pub progress_percent: u8,
}

impl AchievementState {
    pub fn locked() -> Self {
        Self::default()
    }

    pub fn unlocked_at(timestamp_ms: i64) -> Self {
        Self {
            unlocked: true,
            unlocked_at: Some(timestamp_ms),
            progress_percent: 100,
        }
    }
}

/// Get all achievement definitions, in declaration order
pub fn all_achievements() -> Vec<AchievementDefinition> {
    use AchievementCategory::*;
    use StatKey::*;

    vec![
        // Writing achievements
        AchievementDefinition::new(
            "writing-1",
            "First Words",
            "Write 100 words",
            Writing,
            10,
            WordCount,
            100,
        ),
        AchievementDefinition::new(
            "writing-2",
            "Daily Pages",
            "Write 500 words in a single day",
            Writing,
            20,
            WordCountToday,
            500,
        ),
        AchievementDefinition::new(
            "writing-3",
            "Finding Your Voice",
            "Write 1,000 words",
            Writing,
            30,
            WordCount,
            1_000,
        ),
        AchievementDefinition::new(
            "writing-4",
            "Short Story",
            "Write 7,500 words",
            Writing,
            50,
            WordCount,
            7_500,
        ),
        AchievementDefinition::new(
            "writing-5",
            "Novelette",
            "Write 17,500 words",
            Writing,
            75,
            WordCount,
            17_500,
        ),
        AchievementDefinition::new(
            "writing-6",
            "Marathon Day",
            "Write 2,000 words in a single day",
            Writing,
            60,
            WordCountToday,
            2_000,
        ),
        // Character achievements
        AchievementDefinition::new(
            "character-1",
            "Keystrokes",
            "Type 1,000 characters",
            Character,
            10,
            CharacterCount,
            1_000,
        ),
        AchievementDefinition::new(
            "character-2",
            "Ink Stained",
            "Type 10,000 characters",
            Character,
            25,
            CharacterCount,
            10_000,
        ),
        AchievementDefinition::new(
            "character-3",
            "Typesetter",
            "Type 100,000 characters",
            Character,
            60,
            CharacterCount,
            100_000,
        ),
        AchievementDefinition::new(
            "character-4",
            "Printing Press",
            "Type 500,000 characters",
            Character,
            120,
            CharacterCount,
            500_000,
        ),
        // World-building achievements
        AchievementDefinition::new(
            "world-1",
            "Cartographer",
            "Create your first place",
            World,
            10,
            PlaceCount,
            1,
        ),
        AchievementDefinition::new(
            "world-2",
            "Atlas",
            "Create 10 places",
            World,
            30,
            PlaceCount,
            10,
        ),
        AchievementDefinition::new(
            "world-3",
            "First Peoples",
            "Create your first race",
            World,
            10,
            RaceCount,
            1,
        ),
        AchievementDefinition::new(
            "world-4",
            "Melting Pot",
            "Create 5 races",
            World,
            30,
            RaceCount,
            5,
        ),
        AchievementDefinition::new(
            "world-5",
            "Chronicler",
            "Record your first event",
            World,
            10,
            EventCount,
            1,
        ),
        AchievementDefinition::new(
            "world-6",
            "Historian",
            "Record 25 events",
            World,
            40,
            EventCount,
            25,
        ),
        // Commitment achievements
        AchievementDefinition::new(
            "commitment-1",
            "Habit Forming",
            "Write on 3 consecutive days",
            Commitment,
            20,
            WriteStreak,
            3,
        ),
        AchievementDefinition::new(
            "commitment-2",
            "Week of Words",
            "Write on 7 consecutive days",
            Commitment,
            50,
            WriteStreak,
            7,
        ),
        AchievementDefinition::new(
            "commitment-3",
            "Unstoppable",
            "Write on 30 consecutive days",
            Commitment,
            150,
            WriteStreak,
            30,
        ),
        AchievementDefinition::new(
            "commitment-4",
            "Hour of Craft",
            "Spend 60 minutes writing",
            Commitment,
            20,
            WriteTime,
            60,
        ),
        AchievementDefinition::new(
            "commitment-5",
            "Dedicated",
            "Spend 10 hours writing",
            Commitment,
            80,
            WriteTime,
            600,
        ),
        // Milestones
        AchievementDefinition::new(
            "milestone-1",
            "Novella",
            "Write 40,000 words",
            Milestone,
            150,
            WordCount,
            40_000,
        ),
        AchievementDefinition::new(
            "milestone-2",
            "Novelist",
            "Write 50,000 words",
            Milestone,
            200,
            WordCount,
            50_000,
        ),
        AchievementDefinition::new(
            "milestone-3",
            "Epic",
            "Write 100,000 words",
            Milestone,
            400,
            WordCount,
            100_000,
        ),
    ]
}
