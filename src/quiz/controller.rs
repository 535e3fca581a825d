use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    db::{Attempt, AttemptStatus, Database},
    frames::{session_loop, FrameThrottle, LoopContext, ProgressPoll, SessionClock, SessionInput},
    settings::SettingsStore,
};

use super::{EventEmitter, FeedbackThrottle, Quiz, QuizEvent, QuizReport, QuizSession, SessionSnapshot};

const INPUT_BUFFER: usize = 256;

/// Where inputs are stamped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMode {
    /// Wall-clock stamps from a `SessionClock`; progress is polled.
    Live,
    /// Pre-stamped inputs replayed as fast as they are sent.
    Replay,
}

/// What the caller needs to drive a started attempt.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    pub attempt_id: String,
    pub inputs: mpsc::Sender<SessionInput>,
    pub clock: SessionClock,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_id: String,
    pub status: AttemptStatus,
    pub report: QuizReport,
}

struct ActiveAttempt {
    attempt_id: String,
    mode: AttemptMode,
    clock: SessionClock,
    session: Arc<Mutex<QuizSession>>,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    drain_tx: watch::Sender<bool>,
}

impl ActiveAttempt {
    async fn end_ms(&self) -> f64 {
        let latest = self.session.lock().await.latest_ms();
        match self.mode {
            AttemptMode::Live => self.clock.now_ms().max(latest),
            AttemptMode::Replay => latest,
        }
    }
}

#[derive(Clone)]
pub struct QuizController {
    db: Database,
    settings: Arc<SettingsStore>,
    events: EventEmitter,
    active: Arc<Mutex<Option<ActiveAttempt>>>,
    progress_every_tick: bool,
}

impl QuizController {
    pub fn new(db: Database, settings: Arc<SettingsStore>, events: EventEmitter) -> Self {
        let debug_mode = std::env::var("GESTURE_QUIZ_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            db,
            settings,
            events,
            active: Arc::new(Mutex::new(None)),
            progress_every_tick: debug_mode,
        }
    }

    pub async fn start_attempt(&self, quiz: Quiz, mode: AttemptMode) -> Result<AttemptHandle> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            bail!("attempt already active");
        }

        let gesture = self.settings.gesture();
        let feedback = self.settings.feedback();
        let config = gesture
            .selection_config()
            .context("invalid gesture settings")?;

        let title = quiz.title.clone();
        let question_count = quiz.len();
        let session = QuizSession::new(quiz, config, 0.0)?;

        let attempt_id = Uuid::new_v4().to_string();
        self.db
            .insert_attempt(&Attempt::start(
                attempt_id.clone(),
                title.clone(),
                question_count,
                Utc::now(),
            ))
            .await?;

        let clock = SessionClock::start();
        let poll = match mode {
            AttemptMode::Live => Some(ProgressPoll {
                interval: Duration::from_millis(gesture.progress_poll_interval_ms.max(1)),
                clock,
                every_tick: self.progress_every_tick,
            }),
            AttemptMode::Replay => None,
        };

        let session = Arc::new(Mutex::new(session));
        let ctx = LoopContext {
            attempt_id: attempt_id.clone(),
            session: session.clone(),
            db: self.db.clone(),
            events: self.events.clone(),
            feedback: FeedbackThrottle::new(&feedback),
            throttle: FrameThrottle::new(gesture.target_fps),
            poll,
        };

        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
        let (drain_tx, drain_rx) = watch::channel(false);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(session_loop(ctx, input_rx, drain_rx, cancel_token.clone()));

        *active = Some(ActiveAttempt {
            attempt_id: attempt_id.clone(),
            mode,
            clock,
            session,
            handle,
            cancel_token,
            drain_tx,
        });

        info!("Started attempt {attempt_id} for quiz '{title}' ({question_count} questions)");
        self.events.emit(QuizEvent::AttemptStarted {
            attempt_id: attempt_id.clone(),
            quiz_title: title,
            question_count,
        });

        Ok(AttemptHandle {
            attempt_id,
            inputs: input_tx,
            clock,
        })
    }

    /// Handles every queued input, then closes the attempt as `Completed`.
    pub async fn finish(&self) -> Result<AttemptSummary> {
        let mut attempt = self.take_active().await?;

        let _ = attempt.drain_tx.send(true);
        join_loop(&mut attempt).await?;

        self.close(attempt, AttemptStatus::Completed).await
    }

    /// Drops queued inputs and closes the attempt as `Abandoned`.
    pub async fn cancel(&self) -> Result<AttemptSummary> {
        let mut attempt = self.take_active().await?;

        attempt.cancel_token.cancel();
        join_loop(&mut attempt).await?;

        self.close(attempt, AttemptStatus::Abandoned).await
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let active = self.active.lock().await;
        let attempt = active.as_ref()?;
        let now_ms = attempt.end_ms().await;
        let session = attempt.session.lock().await;
        Some(session.snapshot(now_ms))
    }

    async fn take_active(&self) -> Result<ActiveAttempt> {
        self.active
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active attempt"))
    }

    async fn close(&self, attempt: ActiveAttempt, status: AttemptStatus) -> Result<AttemptSummary> {
        let end_ms = attempt.end_ms().await;
        let (report, correct, time_spent_secs) = {
            let session = attempt.session.lock().await;
            let report = session.report(end_ms);
            (report, session.score().correct, session.time_spent_secs(end_ms))
        };

        let unanswered = unanswered_count(&report);
        if unanswered > 0 {
            warn!(
                "Attempt {} closed with {unanswered} unanswered question(s)",
                attempt.attempt_id
            );
        }

        let finished_at: DateTime<Utc> = Utc::now();
        self.db
            .mark_attempt_status(
                &attempt.attempt_id,
                status,
                correct,
                time_spent_secs,
                Some(finished_at),
                finished_at,
            )
            .await?;

        info!(
            "Attempt {} closed as {} ({}/{})",
            attempt.attempt_id,
            status.as_str(),
            correct,
            report.score.total
        );
        self.events.emit(QuizEvent::AttemptFinished {
            attempt_id: attempt.attempt_id.clone(),
            status,
        });

        Ok(AttemptSummary {
            attempt_id: attempt.attempt_id,
            status,
            report,
        })
    }
}

fn unanswered_count(report: &QuizReport) -> usize {
    report
        .questions
        .iter()
        .filter(|q| q.your_answer.is_none())
        .count()
}

async fn join_loop(attempt: &mut ActiveAttempt) -> Result<()> {
    (&mut attempt.handle)
        .await
        .context("session loop task failed to join")
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        quiz::{model::sample_quiz, InputMethod},
        selection::RawObservation,
    };

    struct Harness {
        _dir: tempfile::TempDir,
        db: Database,
        controller: QuizController,
        events: UnboundedReceiver<QuizEvent>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("quiz.db")).unwrap();
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let (emitter, events) = EventEmitter::channel();
        let controller = QuizController::new(db.clone(), settings, emitter);
        Harness {
            _dir: dir,
            db,
            controller,
            events,
        }
    }

    fn drain_events(rx: &mut UnboundedReceiver<QuizEvent>) -> Vec<QuizEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn hold(handle: &AttemptHandle, count: i64, from: u64, to: u64) {
        for t in (from..=to).step_by(100) {
            handle
                .inputs
                .send(SessionInput::Frame(RawObservation::new(count, t as f64)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn replayed_gestures_complete_the_attempt() {
        let mut h = harness();
        let handle = h
            .controller
            .start_attempt(sample_quiz(), AttemptMode::Replay)
            .await
            .unwrap();

        hold(&handle, 2, 0, 2000).await;
        handle.inputs.send(SessionInput::Next { at_ms: 2100.0 }).await.unwrap();
        hold(&handle, 2, 2200, 4200).await;
        handle.inputs.send(SessionInput::Next { at_ms: 4300.0 }).await.unwrap();
        hold(&handle, 2, 4400, 6400).await;
        handle.inputs.send(SessionInput::Finish { at_ms: 6500.0 }).await.unwrap();

        let summary = h.controller.finish().await.unwrap();
        assert_eq!(summary.status, AttemptStatus::Completed);
        assert_eq!(summary.report.score.correct, 3);
        assert_eq!(summary.report.score.percentage, 100);
        assert_eq!(summary.report.time_spent_secs, 6);
        assert!(h.controller.snapshot().await.is_none());

        let stored = h.db.get_attempt(&handle.attempt_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Completed);
        assert_eq!(stored.correct_count, 3);
        assert_eq!(stored.time_spent_secs, 6);

        let answers = h.db.get_answers_for_attempt(&handle.attempt_id).await.unwrap();
        assert_eq!(answers.len(), 3);
        assert!(answers.iter().all(|a| a.method == InputMethod::Gesture && a.correct));

        let events = drain_events(&mut h.events);
        assert!(matches!(events.first(), Some(QuizEvent::AttemptStarted { question_count: 3, .. })));
        let answered = events
            .iter()
            .filter(|e| matches!(e, QuizEvent::Answered(_)))
            .count();
        assert_eq!(answered, 3);
        assert!(events
            .iter()
            .any(|e| matches!(e, QuizEvent::ResultsReady { .. })));
        assert!(matches!(
            events.last(),
            Some(QuizEvent::AttemptFinished {
                status: AttemptStatus::Completed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn click_answers_are_recorded_as_manual() {
        let mut h = harness();
        let handle = h
            .controller
            .start_attempt(sample_quiz(), AttemptMode::Replay)
            .await
            .unwrap();

        handle
            .inputs
            .send(SessionInput::Click {
                option_index: 0,
                at_ms: 1500.0,
            })
            .await
            .unwrap();

        let summary = h.controller.finish().await.unwrap();
        assert_eq!(summary.report.score.correct, 0);
        assert_eq!(summary.report.score.total, 3);
        assert_eq!(summary.report.time_spent_secs, 1);

        let answers = h.db.get_answers_for_attempt(&handle.attempt_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].method, InputMethod::Manual);
        assert!(!answers[0].correct);

        let events = drain_events(&mut h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            QuizEvent::Feedback {
                cue: crate::quiz::feedback::FeedbackCue::Incorrect
            }
        )));
    }

    #[tokio::test]
    async fn only_one_attempt_at_a_time() {
        let h = harness();
        h.controller
            .start_attempt(sample_quiz(), AttemptMode::Replay)
            .await
            .unwrap();

        let err = h
            .controller
            .start_attempt(sample_quiz(), AttemptMode::Replay)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "attempt already active");
    }

    #[tokio::test]
    async fn cancel_marks_attempt_abandoned() {
        let mut h = harness();
        let handle = h
            .controller
            .start_attempt(sample_quiz(), AttemptMode::Replay)
            .await
            .unwrap();

        let snapshot = h.controller.snapshot().await.unwrap();
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.question_count, 3);
        assert!(snapshot.eligible);

        let summary = h.controller.cancel().await.unwrap();
        assert_eq!(summary.status, AttemptStatus::Abandoned);
        assert!(h.controller.snapshot().await.is_none());

        let stored = h.db.get_attempt(&handle.attempt_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Abandoned);

        let events = drain_events(&mut h.events);
        assert!(matches!(
            events.last(),
            Some(QuizEvent::AttemptFinished {
                status: AttemptStatus::Abandoned,
                ..
            })
        ));

        assert_eq!(
            h.controller.finish().await.unwrap_err().to_string(),
            "no active attempt"
        );
    }
}
