use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::selection::{config, SelectionConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureSettings {
    pub max_options: u32,
    pub dwell_ms: u64,
    pub cooldown_ms: u64,
    /// How often the presentation side re-reads hold progress.
    pub progress_poll_interval_ms: u64,
    /// Classifier rate cap; faster frames are dropped before the engine.
    pub target_fps: u32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            max_options: config::DEFAULT_MAX_OPTIONS,
            dwell_ms: config::DEFAULT_DWELL_MS,
            cooldown_ms: config::DEFAULT_COOLDOWN_MS,
            progress_poll_interval_ms: 100,
            target_fps: 30,
        }
    }
}

impl GestureSettings {
    pub fn selection_config(&self) -> Result<SelectionConfig> {
        SelectionConfig::new(self.max_options, self.dwell_ms, self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedbackSettings {
    pub sound_enabled: bool,
    pub sound_cooldown_ms: u64,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_cooldown_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    pub gesture: GestureSettings,
    pub feedback: FeedbackSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn gesture(&self) -> GestureSettings {
        self.read().gesture.clone()
    }

    pub fn feedback(&self) -> FeedbackSettings {
        self.read().feedback.clone()
    }

    /// Validates the gesture thresholds before anything is written.
    pub fn update_gesture(&self, settings: GestureSettings) -> Result<()> {
        settings
            .selection_config()
            .context("Rejected gesture settings")?;

        let mut guard = self.write();
        guard.gesture = settings;
        self.persist(&guard)
    }

    pub fn update_feedback(&self, settings: FeedbackSettings) -> Result<()> {
        let mut guard = self.write();
        guard.feedback = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
