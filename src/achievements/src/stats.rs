//! Tracked writing statistics

use error::GamificationError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Identifier of a tracked writing-activity metric
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "camelCase")]
pub enum StatKey {
    WordCount,
    CharacterCount,
    PlaceCount,
    RaceCount,
    EventCount,
    WriteStreak,
    /// Cumulative writing time in minutes
    WriteTime,
    /// Words written during the current day
    WordCountToday,
}

impl StatKey {
    pub const ALL: [StatKey; 8] = [
        StatKey::WordCount,
        StatKey::CharacterCount,
        StatKey::PlaceCount,
        StatKey::RaceCount,
        StatKey::EventCount,
        StatKey::WriteStreak,
        StatKey::WriteTime,
        StatKey::WordCountToday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::WordCount => "wordCount",
            StatKey::CharacterCount => "characterCount",
            StatKey::PlaceCount => "placeCount",
            StatKey::RaceCount => "raceCount",
            StatKey::EventCount => "eventCount",
            StatKey::WriteStreak => "writeStreak",
            StatKey::WriteTime => "writeTime",
            StatKey::WordCountToday => "wordCountToday",
        }
    }

    /// Cumulative stats never go down within a session
    pub fn is_monotonic(&self) -> bool {
        !matches!(self, StatKey::WriteStreak | StatKey::WordCountToday)
    }

    /// Whether an increase of this stat counts as writing on the current day
    pub fn is_writing_activity(&self) -> bool {
        matches!(
            self,
            StatKey::WordCount
                | StatKey::CharacterCount
                | StatKey::WordCountToday
                | StatKey::WriteTime
        )
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = GamificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| GamificationError::UnknownStat(s.to_string()))
    }
}

/// Result of applying an absolute value to one stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatChange {
    /// Value went up from `previous`
    Raised { previous: u64 },
    /// Value was overwritten (non-monotonic stats only)
    Set { previous: u64 },
    /// Same value as stored
    Unchanged,
    /// Lower than the stored value of a stat that may not regress
    Stale { current: u64 },
}

impl StatChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, StatChange::Raised { .. } | StatChange::Set { .. })
    }
}

/// Current value of every tracked stat.
///
/// Keys that were never written read as zero, so snapshots persisted by older
/// builds stay readable when new stats are added. Keys this build does not
/// know are skipped on load, so snapshots from newer builds stay readable too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, bincode::Encode, bincode::Decode)]
#[serde(transparent)]
pub struct StatSnapshot {
    values: BTreeMap<StatKey, u64>,
}

impl<'de> Deserialize<'de> for StatSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            match name.parse::<StatKey>() {
                Ok(key) => {
                    values.insert(key, value);
                }
                Err(_) => debug!(stat = %name, value, "skipping unknown stat in saved snapshot"),
            }
        }
        Ok(Self { values })
    }
}

impl StatSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StatKey) -> u64 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    /// Apply an absolute value.
    ///
    /// Monotonic stats and `wordCountToday` ignore values lower than the one
    /// stored; `writeStreak` accepts any value.
    pub fn apply(&mut self, key: StatKey, value: u64) -> StatChange {
        let current = self.get(key);
        if value == current {
            return StatChange::Unchanged;
        }
        if key == StatKey::WriteStreak {
            self.values.insert(key, value);
            return StatChange::Set { previous: current };
        }
        if value < current {
            return StatChange::Stale { current };
        }
        self.values.insert(key, value);
        StatChange::Raised { previous: current }
    }

    /// Overwrite a value without the regression check
    pub fn set(&mut self, key: StatKey, value: u64) {
        self.values.insert(key, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKey, u64)> + '_ {
        StatKey::ALL.iter().map(move |key| (*key, self.get(*key)))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_read_zero() {
        let stats = StatSnapshot::new();
        for key in StatKey::ALL {
            assert_eq!(stats.get(key), 0);
        }
    }

    #[test]
    fn test_monotonic_stats_ignore_lower_values() {
        let mut stats = StatSnapshot::new();
        assert_eq!(
            stats.apply(StatKey::WordCount, 500),
            StatChange::Raised { previous: 0 }
        );

        assert_eq!(
            stats.apply(StatKey::WordCount, 300),
            StatChange::Stale { current: 500 }
        );
        assert_eq!(stats.get(StatKey::WordCount), 500);

        assert_eq!(stats.apply(StatKey::WordCount, 500), StatChange::Unchanged);
    }

    #[test]
    fn test_streak_accepts_any_value() {
        let mut stats = StatSnapshot::new();
        stats.apply(StatKey::WriteStreak, 5);
        assert_eq!(
            stats.apply(StatKey::WriteStreak, 1),
            StatChange::Set { previous: 5 }
        );
        assert_eq!(stats.get(StatKey::WriteStreak), 1);
    }

    #[test]
    fn test_parse_stat_key() {
        assert_eq!("wordCountToday".parse::<StatKey>().unwrap(), StatKey::WordCountToday);
        let err = "wordcount".parse::<StatKey>().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_json_keys_are_camel_case() {
        let mut stats = StatSnapshot::new();
        stats.set(StatKey::PlaceCount, 3);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"placeCount":3}"#);
    }

    #[test]
    fn test_unknown_keys_are_skipped_on_load() {
        let stats: StatSnapshot =
            serde_json::from_str(r#"{"wordCount":40000,"pageCount":3}"#).unwrap();
        assert_eq!(stats.get(StatKey::WordCount), 40_000);
        assert_eq!(serde_json::to_string(&stats).unwrap(), r#"{"wordCount":40000}"#);
    }

    #[test]
    fn test_reset() {
        let mut stats = StatSnapshot::new();
        stats.apply(StatKey::RaceCount, 4);
        stats.reset();
        assert_eq!(stats.get(StatKey::RaceCount), 0);
    }
}
