use serde::Serialize;
use tokio::sync::mpsc;

use crate::db::AttemptStatus;

use super::{feedback::FeedbackCue, report::QuizReport, session::AnswerOutcome};

/// Everything the presentation side hears about a running attempt.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QuizEvent {
    AttemptStarted {
        attempt_id: String,
        quiz_title: String,
        question_count: usize,
    },
    Progress {
        question_index: usize,
        tracked_option: Option<u32>,
        progress_fraction: f64,
    },
    Answered(AnswerOutcome),
    Feedback {
        cue: FeedbackCue,
    },
    QuestionChanged {
        question_index: usize,
    },
    ResultsReady {
        report: QuizReport,
    },
    AttemptFinished {
        attempt_id: String,
        status: AttemptStatus,
    },
}

/// Fire-and-forget sink; a closed receiver just drops events.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<QuizEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QuizEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: QuizEvent) {
        let _ = self.tx.send(event);
    }
}
