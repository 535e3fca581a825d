use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_OPTIONS: u32 = 4;
pub const DEFAULT_DWELL_MS: u64 = 2000;
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Thresholds for turning a per-frame finger count into a committed selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionConfig {
    /// Highest count that maps to an option; counts above it are noise.
    pub max_options: u32,

    /// How long one count must be held continuously before it commits.
    pub dwell_ms: u64,

    /// Minimum spacing between two commits.
    pub cooldown_ms: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_options: DEFAULT_MAX_OPTIONS,
            dwell_ms: DEFAULT_DWELL_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl SelectionConfig {
    pub fn new(max_options: u32, dwell_ms: u64, cooldown_ms: u64) -> Result<Self> {
        let config = Self {
            max_options,
            dwell_ms,
            cooldown_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_options < 1 {
            bail!("max_options must be at least 1 (got {})", self.max_options);
        }
        if self.dwell_ms == 0 {
            bail!("dwell_ms must be greater than zero");
        }
        Ok(())
    }

    /// Whether `count` names a selectable option.
    pub fn in_range(&self, count: i64) -> bool {
        count >= 1 && count <= i64::from(self.max_options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_quiz_player() {
        let config = SelectionConfig::default();
        assert_eq!(config.max_options, 4);
        assert_eq!(config.dwell_ms, 2000);
        assert_eq!(config.cooldown_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_options() {
        let err = SelectionConfig::new(0, 2000, 1000).unwrap_err();
        assert!(err.to_string().contains("max_options"));
    }

    #[test]
    fn rejects_zero_dwell() {
        let err = SelectionConfig::new(4, 0, 1000).unwrap_err();
        assert!(err.to_string().contains("dwell_ms"));
    }

    #[test]
    fn zero_cooldown_is_allowed() {
        assert!(SelectionConfig::new(1, 1, 0).is_ok());
    }

    #[test]
    fn range_excludes_zero_negative_and_overflow() {
        let config = SelectionConfig::default();
        assert!(!config.in_range(0));
        assert!(!config.in_range(-1));
        assert!(config.in_range(1));
        assert!(config.in_range(4));
        assert!(!config.in_range(5));
    }
}
