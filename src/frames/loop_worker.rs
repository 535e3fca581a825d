use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::{mpsc, watch, Mutex},
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{AnswerRecord, Database},
    quiz::{AnswerOutcome, EventEmitter, FeedbackThrottle, InputMethod, QuizEvent, QuizSession},
};

use super::{FrameThrottle, SessionClock, SessionInput};

// Per-frame logging; flip off when replaying long traces.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Live progress polling for the presentation side.
#[derive(Debug, Clone, Copy)]
pub struct ProgressPoll {
    pub interval: Duration,
    pub clock: SessionClock,
    /// Emit on every tick even when nothing changed.
    pub every_tick: bool,
}

pub struct LoopContext {
    pub attempt_id: String,
    pub session: Arc<Mutex<QuizSession>>,
    pub db: Database,
    pub events: EventEmitter,
    pub feedback: FeedbackThrottle,
    pub throttle: FrameThrottle,
    pub poll: Option<ProgressPoll>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProgressView {
    question_index: usize,
    tracked_option: Option<u32>,
    progress_fraction: f64,
}

/// Serializes every input of one attempt into its session.
///
/// Exits when the input channel closes, on cancellation, or on a drain signal
/// after handling whatever is already queued.
pub async fn session_loop(
    mut ctx: LoopContext,
    mut inputs: mpsc::Receiver<SessionInput>,
    mut drain_rx: watch::Receiver<bool>,
    cancel_token: CancellationToken,
) {
    let poll_interval = ctx
        .poll
        .map(|poll| poll.interval)
        .unwrap_or(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_view: Option<ProgressView> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("session loop for attempt {} cancelled", ctx.attempt_id);
                break;
            }
            changed = drain_rx.changed() => {
                if changed.is_err() || *drain_rx.borrow() {
                    while let Ok(input) = inputs.try_recv() {
                        handle_input(&mut ctx, input, &mut last_view).await;
                    }
                    log_info!("session loop for attempt {} drained", ctx.attempt_id);
                    break;
                }
            }
            received = inputs.recv() => {
                match received {
                    Some(input) => handle_input(&mut ctx, input, &mut last_view).await,
                    None => {
                        log_info!("input closed for attempt {}", ctx.attempt_id);
                        break;
                    }
                }
            }
            _ = ticker.tick(), if ctx.poll.is_some() => {
                poll_progress(&ctx, &mut last_view).await;
            }
        }
    }
}

async fn poll_progress(ctx: &LoopContext, last_view: &mut Option<ProgressView>) {
    let Some(poll) = ctx.poll else {
        return;
    };
    let now_ms = poll.clock.now_ms();

    let view = {
        let session = ctx.session.lock().await;
        ProgressView {
            question_index: session.current_index(),
            tracked_option: session.tracked_option(),
            progress_fraction: session.peek_progress(now_ms),
        }
    };

    let view = hold_steady(last_view.as_ref(), view);
    if poll.every_tick || last_view.as_ref() != Some(&view) {
        emit_progress(&ctx.events, view);
        *last_view = Some(view);
    }
}

/// Poll and frame paths stamp time differently, so a poll can run ahead of
/// the next frame. Within one hold the emitted fraction never goes back.
fn hold_steady(last: Option<&ProgressView>, view: ProgressView) -> ProgressView {
    match last {
        Some(last)
            if view.tracked_option.is_some()
                && last.question_index == view.question_index
                && last.tracked_option == view.tracked_option =>
        {
            ProgressView {
                progress_fraction: view.progress_fraction.max(last.progress_fraction),
                ..view
            }
        }
        _ => view,
    }
}

fn emit_progress(events: &EventEmitter, view: ProgressView) {
    events.emit(QuizEvent::Progress {
        question_index: view.question_index,
        tracked_option: view.tracked_option,
        progress_fraction: view.progress_fraction,
    });
}

async fn handle_input(
    ctx: &mut LoopContext,
    input: SessionInput,
    last_view: &mut Option<ProgressView>,
) {
    let at_ms = input.at_ms();
    let mut answered: Option<AnswerOutcome> = None;
    let mut results = None;

    {
        let mut session = ctx.session.lock().await;
        session.advance_clock(at_ms);

        match input {
            SessionInput::Frame(frame) => {
                if !ctx.throttle.accept(frame.timestamp_ms) {
                    log_debug!("dropped frame at {}ms (over target rate)", frame.timestamp_ms);
                    return;
                }

                let update = session.handle_frame(frame);
                let view = hold_steady(
                    last_view.as_ref(),
                    ProgressView {
                        question_index: session.current_index(),
                        tracked_option: update.tracked_option,
                        progress_fraction: update.progress_fraction,
                    },
                );
                if last_view.as_ref() != Some(&view) {
                    emit_progress(&ctx.events, view);
                    *last_view = Some(view);
                }
                answered = update.answered;
            }
            SessionInput::Click { option_index, at_ms } => {
                answered = session.select_answer(option_index, InputMethod::Manual, at_ms);
                if answered.is_some() {
                    *last_view = None;
                } else {
                    log_warn!(
                        "click on option {} ignored for question {}",
                        option_index + 1,
                        session.current_index() + 1
                    );
                }
            }
            SessionInput::Next { .. } => {
                if session.next_question() {
                    *last_view = None;
                    ctx.events.emit(QuizEvent::QuestionChanged {
                        question_index: session.current_index(),
                    });
                }
            }
            SessionInput::Previous { .. } => {
                if session.previous_question() {
                    *last_view = None;
                    ctx.events.emit(QuizEvent::QuestionChanged {
                        question_index: session.current_index(),
                    });
                }
            }
            SessionInput::RefreshDetection { .. } => {
                session.reset_gestures();
                ctx.throttle.reset();
                *last_view = None;
                log_info!("gesture detection refreshed");
            }
            SessionInput::Finish { at_ms } => match session.show_results(at_ms) {
                Ok(()) => results = Some(session.report(at_ms)),
                Err(err) => log_warn!("cannot show results yet: {err}"),
            },
        }
    }

    if let Some(outcome) = answered {
        record_answer(ctx, outcome).await;
    }

    if let Some(report) = results {
        ctx.events.emit(QuizEvent::ResultsReady { report });
    }
}

async fn record_answer(ctx: &mut LoopContext, outcome: AnswerOutcome) {
    ctx.events.emit(QuizEvent::Answered(outcome.clone()));

    if let Some(cue) = ctx.feedback.cue(outcome.correct, outcome.answered_ms) {
        ctx.events.emit(QuizEvent::Feedback { cue });
    }

    let record = AnswerRecord {
        id: None,
        attempt_id: ctx.attempt_id.clone(),
        question_index: outcome.question_index,
        option_index: outcome.option_index,
        correct: outcome.correct,
        method: outcome.method,
        answered_at: Utc::now(),
    };

    if let Err(err) = ctx.db.insert_answer(&record).await {
        log_error!(
            "failed to persist answer for attempt {} question {}: {err:?}",
            ctx.attempt_id,
            outcome.question_index + 1
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(question_index: usize, tracked_option: Option<u32>, progress_fraction: f64) -> ProgressView {
        ProgressView {
            question_index,
            tracked_option,
            progress_fraction,
        }
    }

    #[test]
    fn late_frame_does_not_pull_progress_back() {
        let polled = view(0, Some(2), 0.6);
        let frame = hold_steady(Some(&polled), view(0, Some(2), 0.55));
        assert_eq!(frame.progress_fraction, 0.6);

        let later = hold_steady(Some(&frame), view(0, Some(2), 0.7));
        assert_eq!(later.progress_fraction, 0.7);
    }

    #[test]
    fn new_hold_starts_from_zero() {
        let last = view(0, Some(2), 0.9);
        assert_eq!(hold_steady(Some(&last), view(0, Some(3), 0.0)).progress_fraction, 0.0);
        assert_eq!(hold_steady(Some(&last), view(1, Some(2), 0.0)).progress_fraction, 0.0);
        assert_eq!(hold_steady(Some(&last), view(0, None, 0.0)).progress_fraction, 0.0);
        assert_eq!(hold_steady(None, view(0, Some(2), 0.1)).progress_fraction, 0.1);
    }

    #[tokio::test]
    async fn frame_after_poll_keeps_emitted_progress_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("quiz.db")).unwrap();
        let (events, mut rx) = EventEmitter::channel();
        let session = QuizSession::new(
            crate::quiz::model::sample_quiz(),
            crate::selection::SelectionConfig::default(),
            0.0,
        )
        .unwrap();
        let mut ctx = LoopContext {
            attempt_id: "a-1".into(),
            session: Arc::new(Mutex::new(session)),
            db,
            events,
            feedback: FeedbackThrottle::new(&crate::settings::FeedbackSettings::default()),
            throttle: FrameThrottle::new(0),
            poll: None,
        };
        let mut last_view = None;

        let frame = |t: f64| SessionInput::Frame(crate::selection::RawObservation::new(2, t));
        handle_input(&mut ctx, frame(0.0), &mut last_view).await;
        // A poll that ran ahead of the frame stamps.
        last_view = Some(view(0, Some(2), 0.5));
        handle_input(&mut ctx, frame(800.0), &mut last_view).await;
        handle_input(&mut ctx, frame(1200.0), &mut last_view).await;

        let fractions: Vec<f64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                QuizEvent::Progress {
                    progress_fraction, ..
                } => Some(progress_fraction),
                _ => None,
            })
            .collect();
        // 800ms alone would read 0.4; it is held at the polled 0.5 and not re-sent.
        assert_eq!(fractions, vec![0.0, 0.6]);
    }
}
