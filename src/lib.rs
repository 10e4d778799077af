//! Gamification engine for a creative-writing editor
//!
//! Writing statistics flow through a single synchronous pipeline:
//! [`aggregator`] -> achievement evaluation -> [`levels`] ->
//! [`notifications`], all owned by one [`GamificationEngine`].

pub mod aggregator;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod levels;
pub mod notifications;
pub mod progress;

pub use achievements::{
    AchievementCategory, AchievementDefinition, AchievementState, Catalog, StatKey, StatSnapshot,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DayBoundary, EngineConfig};
pub use engine::{GamificationEngine, UpdateReport, UpdateStatus};
pub use error::{GamificationError, GamificationResult};
pub use levels::{LevelProgress, LevelTable, LevelThreshold};
pub use notifications::{Notification, NotificationKind, NotificationQueue};
pub use progress::ProgressState;
pub use save::{FileStore, MemoryStore, ProgressStore, SaveFormat};
