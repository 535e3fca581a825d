use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::InputMethod;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// Assigned by SQLite on insert.
    pub id: Option<i64>,
    pub attempt_id: String,
    pub question_index: usize,
    pub option_index: usize,
    pub correct: bool,
    pub method: InputMethod,
    pub answered_at: DateTime<Utc>,
}
