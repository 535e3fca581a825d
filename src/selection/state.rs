use serde::{Deserialize, Serialize};

/// The count currently being held, and since when.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
    pub tracked_count: u32,
    pub window_start_ms: f64,
    pub active: bool,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, count: u32, now_ms: f64) {
        *self = Self {
            tracked_count: count,
            window_start_ms: now_ms,
            active: true,
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_holding(&self, count: u32) -> bool {
        self.active && self.tracked_count == count
    }

    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.window_start_ms
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CooldownState {
    /// `None` until the first commit of the session.
    pub last_commit_ms: Option<f64>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A decreasing clock yields a negative gap, which counts as still cooling down.
    pub fn allows_commit(&self, now_ms: f64, cooldown_ms: u64) -> bool {
        match self.last_commit_ms {
            None => true,
            Some(last) => now_ms - last >= cooldown_ms as f64,
        }
    }

    pub fn record_commit(&mut self, now_ms: f64) {
        self.last_commit_ms = Some(now_ms);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One classified frame: the finger count and when it was seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    pub count: i64,
    pub timestamp_ms: f64,
}

impl RawObservation {
    pub fn new(count: i64, timestamp_ms: f64) -> Self {
        Self {
            count,
            timestamp_ms,
        }
    }
}
