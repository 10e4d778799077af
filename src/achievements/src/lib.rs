//! Achievements catalog and evaluation
//!
//! This crate holds the static achievement definitions, the tracked writing
//! statistics they are measured against, and the pure evaluator that decides
//! which achievements a stat snapshot unlocks.

pub mod achievement;
pub mod catalog;
pub mod evaluator;
pub mod stats;


pub use achievement::{
    AchievementCategory, AchievementDefinition, AchievementState, all_achievements,
};
pub use catalog::Catalog;
pub use evaluator::{Evaluation, evaluate};
pub use stats::{StatChange, StatKey, StatSnapshot};
