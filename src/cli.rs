//! Command-line host for the engine
//!
//! Each invocation opens the file store, runs one command and exits, so
//! calls are serialized by construction.

use crate::config::EngineConfig;
use crate::engine::{GamificationEngine, UpdateReport, UpdateStatus};
use crate::notifications::Notification;
use crate::progress::ProgressState;
use achievements::AchievementCategory;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use error::{GamificationError, user_message};
use save::ProgressStore;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "quill_quest")]
#[command(about = "Writing progress, achievements and levels")]
#[command(version)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding saved progress (overrides the config file)
    #[arg(long, global = true)]
    pub save_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report the current value of a stat (e.g. wordCount 1200)
    Update {
        stat: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },

    /// Show level, experience and stats
    Status,

    /// List achievements with their progress
    Achievements {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,

        /// Only show locked achievements
        #[arg(long)]
        locked: bool,
    },

    /// Show the next pending notification
    Notify,

    /// Clear all progress
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(dir) = &self.save_dir {
            config.save_dir = dir.clone();
        }
        Ok(config)
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.engine_config()?;
    let mut engine = GamificationEngine::open(&config).context("Failed to open progress")?;

    let output = match &cli.command {
        Commands::Update { stat, value } => {
            let report = engine.update_stat_named(stat, *value);
            if let UpdateStatus::Rejected(e) = report.status {
                return Err(e.into());
            }
            render_update(&report)
        }
        Commands::Status => render_status(&engine),
        Commands::Achievements { category, locked } => {
            let category = category
                .as_deref()
                .map(str::parse::<AchievementCategory>)
                .transpose()?;
            render_achievements(&engine, category, *locked)
        }
        Commands::Notify => match engine.dequeue_next() {
            Some(notification) => {
                let text = render_notification(&notification);
                engine.dismiss();
                text
            }
            None => "No pending notifications".to_string(),
        },
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("Refusing to reset progress without --yes");
            }
            engine.reset();
            "Progress reset to level 1".to_string()
        }
    };

    println!("{}", output);
    if engine.has_unsaved_changes() {
        eprintln!("warning: progress could not be saved");
    }
    Ok(())
}

/// Text shown for a failed command
pub fn error_message(err: &anyhow::Error) -> String {
    match err
        .chain()
        .find_map(|cause| cause.downcast_ref::<GamificationError>())
    {
        Some(e) => user_message(e),
        None => format!("{:#}", err),
    }
}

pub fn render_update(report: &UpdateReport) -> String {
    let mut out = String::new();
    match &report.status {
        UpdateStatus::Applied => {}
        UpdateStatus::Unchanged => out.push_str("No change\n"),
        UpdateStatus::Stale { current } => {
            let _ = writeln!(out, "Ignored: already at {}", current);
        }
        UpdateStatus::Rejected(e) => {
            let _ = writeln!(out, "Rejected: {}", e);
        }
    }
    for definition in &report.newly_unlocked {
        let _ = writeln!(
            out,
            "Achievement unlocked: {} (+{} XP)",
            definition.title, definition.xp
        );
    }
    if report.leveled_up() {
        let _ = writeln!(
            out,
            "Level up! {} -> {} ({})",
            report.level.previous_level, report.level.level, report.level.title
        );
    }
    let _ = write!(
        out,
        "Level {} - {} XP ({:.0}% to next level)",
        report.level.level, report.level.experience, report.level.percent_to_next_level
    );
    out
}

pub fn render_status<S: ProgressStore<ProgressState>>(engine: &GamificationEngine<S>) -> String {
    let level = engine.level_progress();
    let progress = engine.progress();

    let mut out = String::new();
    let _ = writeln!(out, "Level {} - {}", level.level, level.title);
    match level.xp_to_next() {
        Some(missing) => {
            let _ = writeln!(
                out,
                "{} XP ({:.0}% to next level, {} XP to go)",
                level.experience, level.percent_to_next_level, missing
            );
        }
        None => {
            let _ = writeln!(out, "{} XP (max level)", level.experience);
        }
    }
    let _ = writeln!(
        out,
        "Achievements: {}/{}",
        progress.unlocked_count(),
        engine.catalog().len()
    );
    for (key, value) in progress.stats.iter() {
        let _ = writeln!(out, "  {:<15} {}", key, value);
    }
    let _ = write!(out, "  {:<15} {}", "bestStreak", progress.activity.best_streak);
    out
}

pub fn render_achievements<S: ProgressStore<ProgressState>>(
    engine: &GamificationEngine<S>,
    category: Option<AchievementCategory>,
    locked_only: bool,
) -> String {
    let entries = match category {
        Some(category) => engine.achievements_in(category),
        None => engine.achievements(),
    };

    entries
        .into_iter()
        .filter(|(_, state)| !(locked_only && state.unlocked))
        .map(|(definition, state)| {
            let mark = if state.unlocked { "x" } else { " " };
            format!(
                "[{}] {:<14} {:<20} {:>3}%  +{} XP  {}",
                mark,
                definition.id,
                definition.title,
                state.progress_percent,
                definition.xp,
                definition.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_notification(notification: &Notification) -> String {
    match notification {
        Notification::AchievementUnlocked {
            title,
            category,
            xp,
            ..
        } => format!("Achievement unlocked [{}]: {} (+{} XP)", category, title, xp),
        Notification::LevelUp {
            new_level,
            title,
            unlocked_features,
            ..
        } => {
            let mut text = format!("Level up! You reached level {}: {}", new_level, title);
            if !unlocked_features.is_empty() {
                let _ = write!(text, "\nUnlocked: {}", unlocked_features.join(", "));
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::levels::LevelTable;
    use achievements::{Catalog, StatKey};
    use chrono::{TimeZone, Utc};
    use save::MemoryStore;

    fn engine() -> GamificationEngine<MemoryStore<ProgressState>> {
        GamificationEngine::new(
            Catalog::standard().unwrap(),
            LevelTable::standard().unwrap(),
            MemoryStore::new(),
            &EngineConfig::default(),
            Box::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            )),
        )
        .unwrap()
    }

    #[test]
    fn parses_negative_values_for_the_engine_to_reject() {
        let cli = Cli::try_parse_from(["quill_quest", "update", "wordCount", "-5"]).unwrap();
        match cli.command {
            Commands::Update { stat, value } => {
                assert_eq!(stat, "wordCount");
                assert_eq!(value, -5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn save_dir_flag_overrides_config() {
        let cli =
            Cli::try_parse_from(["quill_quest", "--save-dir", "/tmp/qq", "status"]).unwrap();
        let config = cli.engine_config().unwrap();
        assert_eq!(config.save_dir, PathBuf::from("/tmp/qq"));
    }

    #[test]
    fn update_report_mentions_unlocks() {
        let mut engine = engine();
        let report = engine.update_stat(StatKey::WordCount, 1_200);
        let text = render_update(&report);

        assert!(text.contains("Achievement unlocked: First Words (+10 XP)"));
        assert!(text.contains("Achievement unlocked: Finding Your Voice (+30 XP)"));
        assert!(text.ends_with("Level 1 - 40 XP (80% to next level)"));
    }

    #[test]
    fn achievements_listing_filters_locked() {
        let mut engine = engine();
        engine.update_stat(StatKey::PlaceCount, 1);

        let world = render_achievements(&engine, Some(AchievementCategory::World), false);
        assert_eq!(world.lines().count(), 6);
        assert!(world.lines().next().unwrap().starts_with("[x] world-1"));

        let locked = render_achievements(&engine, Some(AchievementCategory::World), true);
        assert_eq!(locked.lines().count(), 5);
        assert!(!locked.contains("world-1 "));
    }

    #[test]
    fn errors_are_reported_through_user_message() {
        let err =
            anyhow::Error::from(GamificationError::CorruptedSave).context("Failed to open progress");
        assert_eq!(
            error_message(&err),
            "Saved progress is corrupted and could not be loaded"
        );

        let err = anyhow::Error::from(GamificationError::UnknownStat("pageCount".to_string()));
        assert_eq!(error_message(&err), "Unknown stat key: pageCount");

        let err = anyhow::anyhow!("plain failure").context("Failed to load config");
        assert_eq!(error_message(&err), "Failed to load config: plain failure");
    }

    #[test]
    fn level_up_notification_lists_features() {
        let text = render_notification(&Notification::LevelUp {
            previous_level: 1,
            new_level: 2,
            title: "Apprentice".to_string(),
            unlocked_features: vec!["custom-themes".to_string()],
        });
        assert_eq!(
            text,
            "Level up! You reached level 2: Apprentice\nUnlocked: custom-themes"
        );
    }
}
