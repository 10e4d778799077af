//! Builders for engines driven by a manual clock and an in-memory store.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use quill_quest::{
    Catalog, DayBoundary, EngineConfig, GamificationEngine, LevelTable, ManualClock, MemoryStore,
    ProgressState,
};

pub type TestEngine = GamificationEngine<MemoryStore<ProgressState>>;

/// Noon UTC on 2024-03-01 plus `n` days
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::days(n)
}

pub fn utc_config() -> EngineConfig {
    EngineConfig {
        day_boundary: DayBoundary::Utc,
        ..EngineConfig::default()
    }
}

pub struct TestEngineBuilder {
    config: EngineConfig,
    store: MemoryStore<ProgressState>,
    start: DateTime<Utc>,
}

impl TestEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: utc_config(),
            store: MemoryStore::new(),
            start: day(0),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: MemoryStore<ProgressState>) -> Self {
        self.store = store;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Engine plus shared handles to its store and clock
    pub fn build(self) -> (TestEngine, MemoryStore<ProgressState>, ManualClock) {
        let clock = ManualClock::new(self.start);
        let engine = GamificationEngine::new(
            Catalog::standard().expect("standard catalog"),
            LevelTable::standard().expect("standard level table"),
            self.store.clone(),
            &self.config,
            Box::new(clock.clone()),
        )
        .expect("engine builds");
        (engine, self.store, clock)
    }
}

pub fn engine() -> (TestEngine, MemoryStore<ProgressState>, ManualClock) {
    TestEngineBuilder::new().build()
}
