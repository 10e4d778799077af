mod helpers;

use achievements::evaluate;
use helpers::engine;
use proptest::prelude::*;
use quill_quest::{Catalog, StatKey, StatSnapshot, UpdateStatus};
use std::collections::BTreeMap;

fn stat_key() -> impl Strategy<Value = StatKey> {
    (0..StatKey::ALL.len()).prop_map(|i| StatKey::ALL[i])
}

fn update() -> impl Strategy<Value = (StatKey, u64, i64)> {
    (stat_key(), 0_u64..60_000, 0_i64..3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn progress_only_moves_forward(updates in prop::collection::vec(update(), 1..40)) {
        let (mut engine, _, clock) = engine();
        let catalog = Catalog::standard().unwrap();

        for (key, value, days) in updates {
            clock.advance_days(days);
            let before = engine.progress().clone();

            let report = engine.update_stat(key, value);
            let after = engine.progress();

            for stat in StatKey::ALL.into_iter().filter(StatKey::is_monotonic) {
                prop_assert!(after.stats.get(stat) >= before.stats.get(stat));
            }
            for (id, state) in &before.achievements {
                if state.unlocked {
                    prop_assert_eq!(after.achievements.get(id), Some(state));
                }
            }
            prop_assert!(after.experience >= before.experience);
            prop_assert!(after.level >= before.level);
            prop_assert!((0.0..=100.0).contains(&report.level.percent_to_next_level));

            let unlocked_xp: u64 = catalog
                .iter()
                .filter(|d| after.is_unlocked(&d.id))
                .map(|d| d.xp as u64)
                .sum();
            prop_assert_eq!(after.experience, unlocked_xp);
        }
    }

    #[test]
    fn stale_update_leaves_state_untouched(key in stat_key(), high in 1_u64..10_000, lower_by in 1_u64..10_000) {
        prop_assume!(key.is_monotonic());
        let (mut engine, _, _) = engine();
        engine.update_stat(key, high);
        let before = engine.progress().clone();

        let report = engine.update_stat(key, high.saturating_sub(lower_by));

        let is_stale = matches!(report.status, UpdateStatus::Stale { .. });
        prop_assert!(is_stale);
        prop_assert!(report.newly_unlocked.is_empty());
        prop_assert_eq!(engine.progress(), &before);
    }

    #[test]
    fn evaluation_is_idempotent(values in prop::collection::vec(0_u64..120_000, StatKey::ALL.len())) {
        let catalog = Catalog::standard().unwrap();
        let mut stats = StatSnapshot::new();
        for (key, value) in StatKey::ALL.into_iter().zip(values) {
            stats.set(key, value);
        }

        let first = evaluate(&stats, &BTreeMap::new(), &catalog, 1);
        let second = evaluate(&stats, &first.updated_states, &catalog, 2);

        prop_assert!(second.newly_unlocked.is_empty());
        prop_assert_eq!(&second.updated_states, &first.updated_states);
    }
}
