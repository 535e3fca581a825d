use serde::{Deserialize, Serialize};

use crate::settings::FeedbackSettings;

/// Which cue the presentation layer should play after an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackCue {
    Correct,
    Incorrect,
}

/// Rate-limits answer cues so two answers in quick succession do not overlap.
#[derive(Debug, Clone)]
pub struct FeedbackThrottle {
    enabled: bool,
    cooldown_ms: f64,
    last_cue_ms: Option<f64>,
}

impl FeedbackThrottle {
    pub fn new(settings: &FeedbackSettings) -> Self {
        Self {
            enabled: settings.sound_enabled,
            cooldown_ms: settings.sound_cooldown_ms as f64,
            last_cue_ms: None,
        }
    }

    pub fn cue(&mut self, correct: bool, now_ms: f64) -> Option<FeedbackCue> {
        if !self.enabled {
            return None;
        }
        if let Some(last) = self.last_cue_ms {
            if now_ms - last < self.cooldown_ms {
                return None;
            }
        }
        self.last_cue_ms = Some(now_ms);
        Some(if correct {
            FeedbackCue::Correct
        } else {
            FeedbackCue::Incorrect
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle(enabled: bool) -> FeedbackThrottle {
        FeedbackThrottle::new(&FeedbackSettings {
            sound_enabled: enabled,
            sound_cooldown_ms: 1000,
        })
    }

    #[test]
    fn cues_match_correctness() {
        let mut throttle = throttle(true);
        assert_eq!(throttle.cue(true, 0.0), Some(FeedbackCue::Correct));
        assert_eq!(throttle.cue(false, 5000.0), Some(FeedbackCue::Incorrect));
    }

    #[test]
    fn second_cue_within_cooldown_is_dropped() {
        let mut throttle = throttle(true);
        assert!(throttle.cue(true, 0.0).is_some());
        assert!(throttle.cue(true, 999.0).is_none());
        assert!(throttle.cue(true, 1000.0).is_some());
    }

    #[test]
    fn disabled_throttle_is_silent() {
        let mut throttle = throttle(false);
        assert!(throttle.cue(true, 0.0).is_none());
    }
}
