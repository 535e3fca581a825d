use anyhow::Result;
use log::debug;
use serde::Serialize;

use super::{CooldownState, RawObservation, SelectionConfig, TrackingState};

/// Result of feeding one frame to the engine.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutput {
    /// Dwell completion in `[0, 1]` for the current hold.
    pub progress_fraction: f64,
    /// Set on the single frame where a hold turns into a selection.
    pub committed_option: Option<u32>,
}

impl SelectionOutput {
    const IDLE: Self = Self {
        progress_fraction: 0.0,
        committed_option: None,
    };

    fn progress(fraction: f64) -> Self {
        Self {
            progress_fraction: fraction,
            committed_option: None,
        }
    }

    fn committed(option: u32) -> Self {
        Self {
            progress_fraction: 1.0,
            committed_option: Some(option),
        }
    }
}

/// Dwell/cooldown state machine over a stream of per-frame finger counts.
///
/// Timestamps must be fed in non-decreasing order. A decreasing clock does not
/// panic: elapsed time is computed as-is, so progress clamps to zero and the
/// cooldown treats the negative gap as still running.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    config: SelectionConfig,
    tracking: TrackingState,
    cooldown: CooldownState,
}

impl SelectionEngine {
    pub fn new(config: SelectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracking: TrackingState::new(),
            cooldown: CooldownState::new(),
        })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn tracking(&self) -> &TrackingState {
        &self.tracking
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub fn observe(&mut self, raw_count: i64, now_ms: f64, eligible: bool) -> SelectionOutput {
        if !eligible {
            self.tracking.reset();
            return SelectionOutput::IDLE;
        }

        if !now_ms.is_finite() || !self.config.in_range(raw_count) {
            self.tracking.reset();
            return SelectionOutput::IDLE;
        }

        // in_range bounds the count to 1..=max_options
        let count = raw_count as u32;

        if !self.tracking.is_holding(count) {
            debug!("tracking {count} finger(s) from {now_ms}ms");
            self.tracking.begin(count, now_ms);
            return SelectionOutput::IDLE;
        }

        let elapsed = self.tracking.elapsed_ms(now_ms);
        let dwell = self.config.dwell_ms as f64;
        if elapsed < dwell {
            return SelectionOutput::progress((elapsed / dwell).clamp(0.0, 1.0));
        }

        self.tracking.reset();

        if !self.cooldown.allows_commit(now_ms, self.config.cooldown_ms) {
            debug!("hold of {count} completed inside cooldown; suppressed");
            return SelectionOutput::progress(1.0);
        }

        self.cooldown.record_commit(now_ms);
        debug!("committed option {count} at {now_ms}ms");
        SelectionOutput::committed(count)
    }

    pub fn observe_frame(&mut self, frame: RawObservation, eligible: bool) -> SelectionOutput {
        self.observe(frame.count, frame.timestamp_ms, eligible)
    }

    /// Current progress without advancing the state machine.
    pub fn peek_progress(&self, now_ms: f64) -> f64 {
        if !self.tracking.active || !now_ms.is_finite() {
            return 0.0;
        }
        let elapsed = self.tracking.elapsed_ms(now_ms);
        (elapsed / self.config.dwell_ms as f64).clamp(0.0, 1.0)
    }

    pub fn tracked_option(&self) -> Option<u32> {
        self.tracking.active.then_some(self.tracking.tracked_count)
    }

    /// Back to a fresh session: no hold in progress, no prior commit.
    pub fn reset(&mut self) {
        self.tracking.reset();
        self.cooldown.reset();
    }

    /// Drops the current hold but keeps the cooldown clock.
    pub fn cancel_hold(&mut self) {
        self.tracking.reset();
    }
}
