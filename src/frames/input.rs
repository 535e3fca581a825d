use serde::{Deserialize, Serialize};

use crate::selection::RawObservation;

/// One entry on the attempt's input queue, already stamped with session time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionInput {
    Frame(RawObservation),
    Next { at_ms: f64 },
    Previous { at_ms: f64 },
    Click { option_index: usize, at_ms: f64 },
    Finish { at_ms: f64 },
    RefreshDetection { at_ms: f64 },
}

impl SessionInput {
    pub fn at_ms(&self) -> f64 {
        match *self {
            SessionInput::Frame(frame) => frame.timestamp_ms,
            SessionInput::Next { at_ms }
            | SessionInput::Previous { at_ms }
            | SessionInput::Click { at_ms, .. }
            | SessionInput::Finish { at_ms }
            | SessionInput::RefreshDetection { at_ms } => at_ms,
        }
    }
}
