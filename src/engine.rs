//! Gamification engine - the single owner of [`ProgressState`]
//!
//! Every mutation runs the same synchronous pipeline:
//! stat update -> achievement evaluation -> experience -> notifications ->
//! save. The host must serialize calls; the engine holds no locks.

use crate::aggregator::{self, DayPolicy};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::levels::{LevelProgress, LevelTable};
use crate::notifications::Notification;
use crate::progress::ProgressState;
use achievements::{
    AchievementCategory, AchievementDefinition, AchievementState, Catalog, StatChange, StatKey,
    evaluate,
};
use error::{GamificationError, GamificationResult};
use save::{FileStore, ProgressStore};
use tracing::{debug, info, warn};

/// How an update call was handled
#[derive(Debug)]
pub enum UpdateStatus {
    /// The new value was stored
    Applied,
    /// The value equals the stored one
    Unchanged,
    /// Lower than the stored value of a stat that may not regress
    Stale { current: u64 },
    /// Invalid input; nothing was mutated
    Rejected(GamificationError),
}

/// Result of one `update_stat` call. Never an `Err`: failures are reported
/// through [`UpdateStatus::Rejected`] so one bad update cannot poison the
/// next.
#[derive(Debug)]
pub struct UpdateReport {
    pub key: Option<StatKey>,
    pub status: UpdateStatus,
    /// In catalog order
    pub newly_unlocked: Vec<AchievementDefinition>,
    pub xp_awarded: u64,
    pub level: LevelProgress,
    /// Whether the state reached the store after this update
    pub persisted: bool,
}

impl UpdateReport {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, UpdateStatus::Applied)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, UpdateStatus::Rejected(_))
    }

    pub fn leveled_up(&self) -> bool {
        self.level.leveled_up
    }

    pub fn unlocked_ids(&self) -> Vec<&str> {
        self.newly_unlocked.iter().map(|d| d.id.as_str()).collect()
    }
}

pub struct GamificationEngine<S> {
    catalog: Catalog,
    levels: LevelTable,
    policy: DayPolicy,
    clock: Box<dyn Clock>,
    store: S,
    state: ProgressState,
    /// Last save failed; retry on the next mutation or `flush`
    dirty: bool,
}

impl<S: ProgressStore<ProgressState>> GamificationEngine<S> {
    /// Build the engine and load saved progress.
    ///
    /// Load failures are logged and fall back to fresh progress, with the
    /// unreadable record moved aside by the store; only an invalid
    /// configuration is an error.
    pub fn new(
        catalog: Catalog,
        levels: LevelTable,
        mut store: S,
        config: &EngineConfig,
        clock: Box<dyn Clock>,
    ) -> GamificationResult<Self> {
        config.validate()?;

        let state = match store.load() {
            Ok(Some(mut state)) => {
                state.normalize(&catalog, Some(&levels));
                info!(
                    experience = state.experience,
                    level = state.level,
                    unlocked = state.unlocked_count(),
                    "loaded saved progress"
                );
                state
            }
            Ok(None) => {
                debug!("no saved progress, starting fresh");
                ProgressState::initial(&catalog)
            }
            Err(e) => {
                warn!(error = %e, "failed to load saved progress, starting fresh");
                if let Err(e) = store.set_aside() {
                    warn!(error = %e, "failed to move unreadable progress aside");
                }
                ProgressState::initial(&catalog)
            }
        };

        Ok(Self {
            catalog,
            levels,
            policy: config.day_policy(),
            clock,
            store,
            state,
            dirty: false,
        })
    }

    /// Built-in catalog and level table, default config, wall clock
    pub fn with_defaults(store: S) -> GamificationResult<Self> {
        Self::new(
            Catalog::standard()?,
            LevelTable::standard()?,
            store,
            &EngineConfig::default(),
            Box::new(SystemClock),
        )
    }

    // ========================================
    // STAT UPDATES
    // ========================================

    /// Store an absolute stat value and run the evaluation pipeline
    pub fn update_stat(&mut self, key: StatKey, value: u64) -> UpdateReport {
        let now = self.clock.now();
        let outcome = aggregator::apply_update(
            &self.policy,
            &mut self.state.stats,
            &mut self.state.activity,
            key,
            value,
            now,
        );

        let status = match outcome.change {
            StatChange::Raised { .. } | StatChange::Set { .. } => UpdateStatus::Applied,
            StatChange::Unchanged => UpdateStatus::Unchanged,
            StatChange::Stale { current } => {
                debug!(stat = %key, value, current, "ignoring stale stat update");
                UpdateStatus::Stale { current }
            }
        };
        if let Some(streak) = outcome.streak_extended {
            debug!(streak, "write streak extended");
        }

        let newly_unlocked = self.evaluate_achievements(now.timestamp_millis());
        let xp_awarded: u64 = newly_unlocked.iter().map(|d| d.xp as u64).sum();
        let level = self.grant_experience(xp_awarded);

        for definition in &newly_unlocked {
            self.state
                .pending_notifications
                .enqueue(Notification::achievement(definition));
        }
        self.enqueue_level_up(&level);

        let persisted = if outcome.mutated() || !newly_unlocked.is_empty() || self.dirty {
            self.persist()
        } else {
            true
        };

        UpdateReport {
            key: Some(key),
            status,
            newly_unlocked,
            xp_awarded,
            level,
            persisted,
        }
    }

    /// Like [`update_stat`](Self::update_stat) for untyped callers: unknown
    /// keys and negative values come back as `Rejected`
    pub fn update_stat_named(&mut self, key: &str, value: i64) -> UpdateReport {
        let parsed = key.parse::<StatKey>().and_then(|key| {
            u64::try_from(value)
                .map(|value| (key, value))
                .map_err(|_| {
                    GamificationError::InvalidInput(format!(
                        "{} must not be negative (got {})",
                        key, value
                    ))
                })
        });

        match parsed {
            Ok((key, value)) => self.update_stat(key, value),
            Err(e) => {
                debug!(stat = key, value, error = %e, "rejected stat update");
                self.rejected(e)
            }
        }
    }

    /// Apply several updates in order
    pub fn update_stats(
        &mut self,
        updates: impl IntoIterator<Item = (StatKey, u64)>,
    ) -> Vec<UpdateReport> {
        updates
            .into_iter()
            .map(|(key, value)| self.update_stat(key, value))
            .collect()
    }

    /// Grant experience outside of achievements (e.g. host bonuses)
    pub fn award_experience(&mut self, delta: i64) -> GamificationResult<LevelProgress> {
        let progress = self
            .levels
            .apply_experience(self.state.experience, delta)?;
        self.state.experience = progress.experience;
        self.state.level = progress.level;
        self.enqueue_level_up(&progress);
        if delta > 0 {
            self.persist();
        }
        Ok(progress)
    }

    fn rejected(&self, error: GamificationError) -> UpdateReport {
        UpdateReport {
            key: None,
            status: UpdateStatus::Rejected(error),
            newly_unlocked: Vec::new(),
            xp_awarded: 0,
            level: self.level_progress(),
            persisted: !self.dirty,
        }
    }

    fn evaluate_achievements(&mut self, now_ms: i64) -> Vec<AchievementDefinition> {
        let evaluation = evaluate(
            &self.state.stats,
            &self.state.achievements,
            &self.catalog,
            now_ms,
        );
        let newly_unlocked: Vec<AchievementDefinition> =
            evaluation.newly_unlocked.into_iter().cloned().collect();
        self.state.achievements = evaluation.updated_states;

        for definition in &newly_unlocked {
            info!(
                id = %definition.id,
                title = %definition.title,
                xp = definition.xp,
                "achievement unlocked"
            );
        }
        newly_unlocked
    }

    fn grant_experience(&mut self, delta: u64) -> LevelProgress {
        let progress = self.levels.advance(self.state.experience, delta);
        self.state.experience = progress.experience;
        self.state.level = progress.level;
        progress
    }

    fn enqueue_level_up(&mut self, progress: &LevelProgress) {
        if !progress.leveled_up {
            return;
        }
        info!(
            from = progress.previous_level,
            to = progress.level,
            title = %progress.title,
            "level up"
        );
        self.state.pending_notifications.enqueue(Notification::LevelUp {
            previous_level: progress.previous_level,
            new_level: progress.level,
            title: progress.title.clone(),
            unlocked_features: self
                .levels
                .features_between(progress.previous_level, progress.level),
        });
    }

    // ========================================
    // NOTIFICATIONS
    // ========================================

    /// Dismiss the active notification and activate the next one
    pub fn dequeue_next(&mut self) -> Option<Notification> {
        let had_active = self.state.pending_notifications.active().is_some();
        let next = self.state.pending_notifications.dequeue_next();
        if next.is_some() || had_active {
            self.persist();
        }
        next
    }

    /// Dismiss the active notification without showing another
    pub fn dismiss(&mut self) -> Option<Notification> {
        let dismissed = self.state.pending_notifications.dismiss();
        if dismissed.is_some() {
            self.persist();
        }
        dismissed
    }

    pub fn active_notification(&self) -> Option<&Notification> {
        self.state.pending_notifications.active()
    }

    pub fn pending_notifications(&self) -> impl Iterator<Item = &Notification> {
        self.state.pending_notifications.pending()
    }

    // ========================================
    // QUERIES
    // ========================================

    /// Read-only view of the whole state
    pub fn progress(&self) -> &ProgressState {
        &self.state
    }

    pub fn level_progress(&self) -> LevelProgress {
        self.levels.progress(self.state.experience, self.state.level)
    }

    /// Every achievement with its state, in catalog order
    pub fn achievements(&self) -> Vec<(&AchievementDefinition, AchievementState)> {
        self.catalog
            .iter()
            .map(|definition| (definition, self.state_of(definition)))
            .collect()
    }

    pub fn achievements_in(
        &self,
        category: AchievementCategory,
    ) -> Vec<(&AchievementDefinition, AchievementState)> {
        self.catalog
            .by_category(category)
            .map(|definition| (definition, self.state_of(definition)))
            .collect()
    }

    pub fn achievement(
        &self,
        id: &str,
    ) -> GamificationResult<(&AchievementDefinition, AchievementState)> {
        let definition = self.catalog.get(id)?;
        Ok((definition, self.state_of(definition)))
    }

    /// Share of the catalog unlocked (0.0 to 1.0)
    pub fn unlock_ratio(&self) -> f32 {
        if self.catalog.is_empty() {
            return 0.0;
        }
        self.state.unlocked_count() as f32 / self.catalog.len() as f32
    }

    pub fn unlocked_features(&self) -> Vec<&str> {
        self.levels.features_up_to(self.state.level)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    fn state_of(&self, definition: &AchievementDefinition) -> AchievementState {
        self.state
            .achievements
            .get(&definition.id)
            .cloned()
            .unwrap_or_default()
    }

    // ========================================
    // LIFECYCLE
    // ========================================

    /// Back to level 1, zero XP, everything locked, empty queue
    pub fn reset(&mut self) {
        self.state = ProgressState::initial(&self.catalog);
        info!("progress reset");
        self.persist();
    }

    /// Retry a failed save
    pub fn flush(&mut self) -> GamificationResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.store.save(&self.state)?;
        self.dirty = false;
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self) -> bool {
        match self.store.save(&self.state) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to save progress, keeping it in memory");
                self.dirty = true;
                false
            }
        }
    }
}

impl GamificationEngine<FileStore> {
    /// Open the file-backed engine described by `config`
    pub fn open(config: &EngineConfig) -> GamificationResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|e| {
                    GamificationError::Config(format!(
                        "failed to read catalog {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Catalog::from_toml_str(&source)?
            }
            None => Catalog::standard()?,
        };
        let store = FileStore::new(&config.save_dir, config.save_format)?;

        Self::new(
            catalog,
            LevelTable::standard()?,
            store,
            config,
            Box::new(SystemClock),
        )
    }
}
