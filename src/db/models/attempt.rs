use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttemptStatus {
    Running,
    Completed,
    Abandoned,
    Interrupted,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Running => "Running",
            AttemptStatus::Completed => "Completed",
            AttemptStatus::Abandoned => "Abandoned",
            AttemptStatus::Interrupted => "Interrupted",
        }
    }
}

/// One play-through of a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub quiz_title: String,
    pub question_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    pub correct_count: usize,
    pub time_spent_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attempt {
    pub fn start(id: String, quiz_title: String, question_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            id,
            quiz_title,
            question_count,
            started_at: now,
            finished_at: None,
            status: AttemptStatus::Running,
            correct_count: 0,
            time_spent_secs: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
