//! Notification sequencing for achievement unlocks and level-ups
//!
//! Notifications move `Queued -> Active -> Dismissed`. At most one is active;
//! the queue never advances on its own, the UI pulls the next one with
//! [`NotificationQueue::dequeue_next`] once the previous is dismissed.

use achievements::{AchievementCategory, AchievementDefinition};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Achievement,
    LevelUp,
}

/// An event waiting to be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename = "achievement", rename_all = "camelCase")]
    AchievementUnlocked {
        id: String,
        title: String,
        category: AchievementCategory,
        xp: u32,
    },
    #[serde(rename_all = "camelCase")]
    LevelUp {
        previous_level: u32,
        new_level: u32,
        title: String,
        unlocked_features: Vec<String>,
    },
}

impl Notification {
    pub fn achievement(definition: &AchievementDefinition) -> Self {
        Notification::AchievementUnlocked {
            id: definition.id.clone(),
            title: definition.title.clone(),
            category: definition.category,
            xp: definition.xp,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::AchievementUnlocked { .. } => NotificationKind::Achievement,
            Notification::LevelUp { .. } => NotificationKind::LevelUp,
        }
    }

    fn achievement_id(&self) -> Option<&str> {
        match self {
            Notification::AchievementUnlocked { id, .. } => Some(id),
            Notification::LevelUp { .. } => None,
        }
    }

    fn new_level(&self) -> Option<u32> {
        match self {
            Notification::LevelUp { new_level, .. } => Some(*new_level),
            Notification::AchievementUnlocked { .. } => None,
        }
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
    active: Option<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `notification`; returns false when it was dropped as a duplicate.
    ///
    /// An achievement already pending or active is dropped, and so is a
    /// level-up whose level a pending or active level-up already reached.
    /// Everything else keeps arrival order, so each level-up stays behind
    /// the achievements of the update that caused it.
    pub fn enqueue(&mut self, notification: Notification) -> bool {
        let mut queued = self.active.iter().chain(self.pending.iter());
        let duplicate = match (notification.achievement_id(), notification.new_level()) {
            (Some(id), _) => queued.any(|n| n.achievement_id() == Some(id)),
            (None, Some(level)) => {
                queued.any(|n| n.new_level().is_some_and(|reached| reached >= level))
            }
            (None, None) => false,
        };
        if duplicate {
            return false;
        }
        self.pending.push_back(notification);
        true
    }

    /// Dismiss the active notification, if any, then activate and return the head
    pub fn dequeue_next(&mut self) -> Option<Notification> {
        self.active = self.pending.pop_front();
        self.active.clone()
    }

    /// Discard the active notification
    pub fn dismiss(&mut self) -> Option<Notification> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&Notification> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
    }
}
