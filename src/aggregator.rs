//! Stat aggregation: regression guard, day rollover and write streaks
//!
//! Every update first rolls the day-scoped stats forward to "today", then
//! applies the new absolute value. `wordCountToday` is zeroed when the
//! stored update day differs from today. The write streak breaks when more
//! than `1 + grace_days` days passed since the last writing day, and grows by
//! one on the first writing activity of a new day.

use crate::config::DayBoundary;
use achievements::{StatChange, StatKey, StatSnapshot};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Day rollover and streak reset rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPolicy {
    pub boundary: DayBoundary,
    pub grace_days: u32,
    pub reset_value: u64,
}

impl Default for DayPolicy {
    fn default() -> Self {
        Self {
            boundary: DayBoundary::Local,
            grace_days: 0,
            reset_value: 0,
        }
    }
}

impl DayPolicy {
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self.boundary {
            DayBoundary::Local => day_in(instant, &Local),
            DayBoundary::Utc => day_in(instant, &Utc),
        }
    }

    /// Whether a streak whose last writing day is `last` is still alive on `today`
    fn continues(&self, last: NaiveDate, today: NaiveDate) -> bool {
        (today - last).num_days() <= 1 + self.grace_days as i64
    }
}

/// Calendar day of `instant` as seen in `zone`
fn day_in<Tz: TimeZone>(instant: DateTime<Utc>, zone: &Tz) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

/// Day bookkeeping persisted next to the stats
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityLog {
    /// Day of the most recent update call, `YYYY-MM-DD`
    pub last_update_day: Option<String>,
    /// Most recent day that counted towards the write streak
    pub last_writing_day: Option<String>,
    pub best_streak: u64,
}

impl ActivityLog {
    fn parse(day: &Option<String>) -> Option<NaiveDate> {
        day.as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, DAY_FORMAT).ok())
    }

    pub fn last_writing_day(&self) -> Option<NaiveDate> {
        Self::parse(&self.last_writing_day)
    }

    pub fn last_update_day(&self) -> Option<NaiveDate> {
        Self::parse(&self.last_update_day)
    }
}

/// What one update did to the stats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub change: StatChange,
    /// `wordCountToday` was zeroed for a new day
    pub daily_reset: bool,
    /// The write streak was broken by missed days
    pub streak_broken: bool,
    /// New streak value if today's activity extended it
    pub streak_extended: Option<u64>,
}

impl AggregateOutcome {
    /// Whether anything in the snapshot or the activity log changed
    pub fn mutated(&self) -> bool {
        self.change.is_applied()
            || self.daily_reset
            || self.streak_broken
            || self.streak_extended.is_some()
    }
}

/// Roll day-scoped stats forward to the day of `now` without applying a value
fn roll_over(
    policy: &DayPolicy,
    stats: &mut StatSnapshot,
    activity: &mut ActivityLog,
    now: DateTime<Utc>,
) -> (bool, bool) {
    let today = policy.day_of(now);

    let mut daily_reset = false;
    if activity.last_update_day() != Some(today) {
        if stats.get(StatKey::WordCountToday) > 0 {
            stats.set(StatKey::WordCountToday, 0);
            daily_reset = true;
        }
        activity.last_update_day = Some(today.format(DAY_FORMAT).to_string());
    }

    let mut streak_broken = false;
    if let Some(last) = activity.last_writing_day() {
        let streak = stats.get(StatKey::WriteStreak);
        if !policy.continues(last, today) && streak > policy.reset_value {
            debug!(last_writing_day = %last, %today, streak, "write streak broken");
            stats.set(StatKey::WriteStreak, policy.reset_value);
            streak_broken = true;
        }
    }

    (daily_reset, streak_broken)
}

/// Apply an absolute value for `key` as of `now`
pub fn apply_update(
    policy: &DayPolicy,
    stats: &mut StatSnapshot,
    activity: &mut ActivityLog,
    key: StatKey,
    value: u64,
    now: DateTime<Utc>,
) -> AggregateOutcome {
    let (daily_reset, streak_broken) = roll_over(policy, stats, activity, now);
    let today = policy.day_of(now);
    let today_key = today.format(DAY_FORMAT).to_string();

    let change = stats.apply(key, value);
    let mut streak_extended = None;

    if key == StatKey::WriteStreak {
        if change.is_applied() && value > 0 {
            // An explicit streak counts today as a writing day
            activity.last_writing_day = Some(today_key);
        }
    } else if matches!(change, StatChange::Raised { .. })
        && key.is_writing_activity()
        && activity.last_writing_day() != Some(today)
    {
        let streak = match activity.last_writing_day() {
            Some(last) if policy.continues(last, today) => stats.get(StatKey::WriteStreak) + 1,
            _ => 1,
        };
        stats.set(StatKey::WriteStreak, streak);
        activity.last_writing_day = Some(today_key);
        streak_extended = Some(streak);
    }

    activity.best_streak = activity.best_streak.max(stats.get(StatKey::WriteStreak));

    AggregateOutcome {
        change,
        daily_reset,
        streak_broken,
        streak_extended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn utc_policy() -> DayPolicy {
        DayPolicy {
            boundary: DayBoundary::Utc,
            ..DayPolicy::default()
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn stale_cumulative_value_is_ignored() {
        let policy = utc_policy();
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(&policy, &mut stats, &mut activity, StatKey::PlaceCount, 4, day(0));
        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::PlaceCount, 2, day(0));

        assert_eq!(outcome.change, StatChange::Stale { current: 4 });
        assert!(!outcome.mutated());
        assert_eq!(stats.get(StatKey::PlaceCount), 4);
    }

    #[test]
    fn daily_words_reset_on_a_new_day() {
        let policy = utc_policy();
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(&policy, &mut stats, &mut activity, StatKey::WordCountToday, 800, day(0));
        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::WordCountToday, 50, day(1));

        assert!(outcome.daily_reset);
        assert_eq!(outcome.change, StatChange::Raised { previous: 0 });
        assert_eq!(stats.get(StatKey::WordCountToday), 50);
    }

    #[test]
    fn consecutive_writing_days_extend_the_streak() {
        let policy = utc_policy();
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        for (n, words) in [(0, 100), (1, 300), (2, 600)] {
            let outcome =
                apply_update(&policy, &mut stats, &mut activity, StatKey::WordCount, words, day(n));
            assert_eq!(outcome.streak_extended, Some(n as u64 + 1));
        }

        // Writing again the same day does not count twice
        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::WordCount, 700, day(2));
        assert_eq!(outcome.streak_extended, None);
        assert_eq!(stats.get(StatKey::WriteStreak), 3);
        assert_eq!(activity.best_streak, 3);
    }

    #[test]
    fn missed_day_breaks_the_streak_before_the_next_increment() {
        let policy = utc_policy();
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(&policy, &mut stats, &mut activity, StatKey::WriteStreak, 3, day(0));

        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::WordCount, 250, day(2));
        assert!(outcome.streak_broken);
        assert_eq!(outcome.streak_extended, Some(1));
        assert_eq!(stats.get(StatKey::WriteStreak), 1);
        assert_eq!(activity.best_streak, 3);
    }

    #[test]
    fn grace_days_keep_the_streak_alive() {
        let policy = DayPolicy {
            grace_days: 1,
            ..utc_policy()
        };
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(&policy, &mut stats, &mut activity, StatKey::WordCount, 100, day(0));
        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::WordCount, 200, day(2));

        assert!(!outcome.streak_broken);
        assert_eq!(stats.get(StatKey::WriteStreak), 2);
    }

    #[test]
    fn non_writing_update_only_breaks_the_streak() {
        let policy = DayPolicy {
            reset_value: 1,
            ..utc_policy()
        };
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(&policy, &mut stats, &mut activity, StatKey::WriteStreak, 5, day(0));
        let outcome =
            apply_update(&policy, &mut stats, &mut activity, StatKey::RaceCount, 1, day(4));

        assert!(outcome.streak_broken);
        assert_eq!(outcome.streak_extended, None);
        assert_eq!(stats.get(StatKey::WriteStreak), 1);
    }

    fn local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
            .earliest()
            .expect("local time exists")
            .with_timezone(&Utc)
    }

    #[test]
    fn day_follows_the_zone_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();

        assert_eq!(day_in(instant, &tokyo), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(day_in(instant, &new_york), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(day_in(instant, &Utc), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn default_policy_rolls_over_at_local_midnight() {
        let policy = DayPolicy::default();
        assert_eq!(policy.boundary, DayBoundary::Local);
        let mut stats = StatSnapshot::new();
        let mut activity = ActivityLog::default();

        apply_update(
            &policy,
            &mut stats,
            &mut activity,
            StatKey::WordCountToday,
            200,
            local(15, 0, 5),
        );
        let outcome = apply_update(
            &policy,
            &mut stats,
            &mut activity,
            StatKey::WordCountToday,
            600,
            local(15, 23, 55),
        );
        assert!(!outcome.daily_reset);
        assert_eq!(activity.last_update_day.as_deref(), Some("2024-01-15"));

        let outcome = apply_update(
            &policy,
            &mut stats,
            &mut activity,
            StatKey::WordCountToday,
            40,
            local(16, 0, 5),
        );
        assert!(outcome.daily_reset);
        assert_eq!(stats.get(StatKey::WordCountToday), 40);
        assert_eq!(activity.last_update_day.as_deref(), Some("2024-01-16"));
        assert_eq!(stats.get(StatKey::WriteStreak), 2);
    }
}
