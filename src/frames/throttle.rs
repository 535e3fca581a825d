/// Drops frames that arrive faster than the classifier's target rate.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval_ms: f64,
    last_accepted_ms: Option<f64>,
}

impl FrameThrottle {
    /// `target_fps == 0` disables throttling.
    pub fn new(target_fps: u32) -> Self {
        let interval_ms = if target_fps == 0 {
            0.0
        } else {
            1000.0 / f64::from(target_fps)
        };
        Self {
            interval_ms,
            last_accepted_ms: None,
        }
    }

    pub fn accept(&mut self, timestamp_ms: f64) -> bool {
        if let Some(last) = self.last_accepted_ms {
            if timestamp_ms - last < self.interval_ms {
                return false;
            }
        }
        self.last_accepted_ms = Some(timestamp_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }
}
