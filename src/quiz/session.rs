use anyhow::{bail, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::selection::{RawObservation, SelectionConfig, SelectionEngine};

use super::{
    model::{Quiz, QuizQuestion},
    report::QuizReport,
    score::QuizScore,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InputMethod {
    Gesture,
    Manual,
}

impl InputMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMethod::Gesture => "Gesture",
            InputMethod::Manual => "Manual",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub question_index: usize,
    pub option_index: usize,
    pub correct: bool,
    pub method: InputMethod,
    pub answered_ms: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GestureUpdate {
    pub progress_fraction: f64,
    /// 1-based finger count being held, if any.
    pub tracked_option: Option<u32>,
    pub answered: Option<AnswerOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_index: usize,
    pub question_count: usize,
    pub selected: Vec<Option<usize>>,
    pub eligible: bool,
    pub showing_results: bool,
    pub tracked_option: Option<u32>,
    pub time_spent_secs: u64,
}

/// One attempt at a quiz: question cursor, recorded answers and the gesture
/// engine that feeds them.
pub struct QuizSession {
    quiz: Quiz,
    engine: SelectionEngine,
    current_index: usize,
    selected: Vec<Option<usize>>,
    showing_results: bool,
    started_ms: f64,
    finished_ms: Option<f64>,
    latest_ms: f64,
}

impl QuizSession {
    pub fn new(quiz: Quiz, config: SelectionConfig, started_ms: f64) -> Result<Self> {
        quiz.validate()?;
        let engine = SelectionEngine::new(config)?;
        let selected = vec![None; quiz.len()];

        Ok(Self {
            quiz,
            engine,
            current_index: 0,
            selected,
            showing_results: false,
            started_ms,
            finished_ms: None,
            latest_ms: started_ms,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.quiz.questions[self.current_index]
    }

    /// Gestures only count while the current question is still open.
    pub fn is_eligible(&self) -> bool {
        !self.showing_results && self.selected[self.current_index].is_none()
    }

    pub fn handle_frame(&mut self, frame: RawObservation) -> GestureUpdate {
        self.handle_finger_count(frame.count, frame.timestamp_ms)
    }

    pub fn handle_finger_count(&mut self, count: i64, now_ms: f64) -> GestureUpdate {
        let eligible = self.is_eligible();
        let output = self.engine.observe(count, now_ms, eligible);

        let answered = output.committed_option.and_then(|option| {
            let option_index = option as usize - 1;
            if option_index >= self.current_question().options.len() {
                warn!(
                    "ignoring option {} for question {} with {} options",
                    option,
                    self.current_index + 1,
                    self.current_question().options.len()
                );
                return None;
            }
            self.select_answer(option_index, InputMethod::Gesture, now_ms)
        });

        GestureUpdate {
            progress_fraction: output.progress_fraction,
            tracked_option: self.engine.tracked_option(),
            answered,
        }
    }

    pub fn peek_progress(&self, now_ms: f64) -> f64 {
        if !self.is_eligible() {
            return 0.0;
        }
        self.engine.peek_progress(now_ms)
    }

    pub fn tracked_option(&self) -> Option<u32> {
        self.engine.tracked_option()
    }

    /// Records an answer for the current question at most once.
    pub fn select_answer(
        &mut self,
        option_index: usize,
        method: InputMethod,
        now_ms: f64,
    ) -> Option<AnswerOutcome> {
        if !self.is_eligible() {
            return None;
        }

        let question = self.current_question();
        if option_index >= question.options.len() {
            return None;
        }
        let correct = option_index == question.correct_answer;

        self.selected[self.current_index] = Some(option_index);
        self.engine.cancel_hold();
        debug!(
            "question {} answered with option {} via {}",
            self.current_index + 1,
            option_index,
            method.as_str()
        );

        Some(AnswerOutcome {
            question_index: self.current_index,
            option_index,
            correct,
            method,
            answered_ms: now_ms,
        })
    }

    pub fn next_question(&mut self) -> bool {
        if self.showing_results || self.current_index + 1 >= self.quiz.len() {
            return false;
        }
        self.current_index += 1;
        self.engine.reset();
        true
    }

    pub fn previous_question(&mut self) -> bool {
        if self.showing_results || self.current_index == 0 {
            return false;
        }
        self.current_index -= 1;
        self.engine.reset();
        true
    }

    pub fn all_answered(&self) -> bool {
        self.selected.iter().all(Option::is_some)
    }

    pub fn show_results(&mut self, now_ms: f64) -> Result<()> {
        if self.showing_results {
            return Ok(());
        }
        if !self.all_answered() {
            let open = self.selected.iter().filter(|s| s.is_none()).count();
            bail!("{open} question(s) still unanswered");
        }
        self.showing_results = true;
        self.finished_ms = Some(now_ms);
        self.engine.reset();
        Ok(())
    }

    /// Drops any half-held gesture, as after reloading the hand model.
    pub fn reset_gestures(&mut self) {
        self.engine.cancel_hold();
    }

    /// Records the newest input time seen; the clock never moves backwards.
    pub fn advance_clock(&mut self, now_ms: f64) {
        if now_ms.is_finite() && now_ms > self.latest_ms {
            self.latest_ms = now_ms;
        }
    }

    pub fn latest_ms(&self) -> f64 {
        self.latest_ms
    }

    pub fn time_spent_secs(&self, now_ms: f64) -> u64 {
        let end = self.finished_ms.unwrap_or(now_ms);
        let elapsed = end - self.started_ms;
        if elapsed.is_finite() && elapsed > 0.0 {
            (elapsed / 1000.0).floor() as u64
        } else {
            0
        }
    }

    pub fn score(&self) -> QuizScore {
        QuizScore::from_answers(&self.quiz, &self.selected)
    }

    pub fn report(&self, now_ms: f64) -> QuizReport {
        QuizReport::build(&self.quiz, &self.selected, self.time_spent_secs(now_ms))
    }

    pub fn snapshot(&self, now_ms: f64) -> SessionSnapshot {
        SessionSnapshot {
            current_index: self.current_index,
            question_count: self.quiz.len(),
            selected: self.selected.clone(),
            eligible: self.is_eligible(),
            showing_results: self.showing_results,
            tracked_option: self.engine.tracked_option(),
            time_spent_secs: self.time_spent_secs(now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::model::sample_quiz;

    fn session() -> QuizSession {
        QuizSession::new(sample_quiz(), SelectionConfig::default(), 0.0).unwrap()
    }

    fn hold(session: &mut QuizSession, count: i64, from: u64, to: u64, step: u64) -> Vec<GestureUpdate> {
        (from..=to)
            .step_by(step as usize)
            .map(|t| session.handle_finger_count(count, t as f64))
            .collect()
    }

    #[test]
    fn gesture_hold_records_answer() {
        let mut session = session();
        let updates = hold(&mut session, 2, 0, 2000, 100);

        let answered: Vec<_> = updates.iter().filter_map(|u| u.answered.clone()).collect();
        assert_eq!(answered.len(), 1);
        assert_eq!(answered[0].question_index, 0);
        assert_eq!(answered[0].option_index, 1);
        assert!(answered[0].correct);
        assert_eq!(answered[0].method, InputMethod::Gesture);
        assert_eq!(session.selected[0], Some(1));
    }

    #[test]
    fn answered_question_ignores_further_gestures() {
        let mut session = session();
        hold(&mut session, 1, 0, 2000, 100);
        assert_eq!(session.selected[0], Some(0));
        assert!(!session.is_eligible());

        let updates = hold(&mut session, 3, 2100, 6000, 100);
        assert!(updates.iter().all(|u| u.answered.is_none()));
        assert!(updates.iter().all(|u| u.progress_fraction == 0.0));
        assert_eq!(session.selected[0], Some(0));
    }

    #[test]
    fn manual_answer_mid_hold_discards_progress() {
        let mut session = session();
        hold(&mut session, 3, 0, 1500, 100);
        assert!(session.peek_progress(1500.0) > 0.0);

        let outcome = session.select_answer(1, InputMethod::Manual, 1550.0).unwrap();
        assert!(outcome.correct);

        let update = session.handle_finger_count(3, 2000.0);
        assert!(update.answered.is_none());
        assert_eq!(session.selected[0], Some(1));
        assert_eq!(session.peek_progress(2000.0), 0.0);
    }

    #[test]
    fn select_answer_is_idempotent() {
        let mut session = session();
        assert!(session.select_answer(0, InputMethod::Manual, 0.0).is_some());
        assert!(session.select_answer(1, InputMethod::Manual, 10.0).is_none());
        assert_eq!(session.selected[0], Some(0));
    }

    #[test]
    fn out_of_range_manual_answer_is_rejected() {
        let mut session = session();
        assert!(session.select_answer(4, InputMethod::Manual, 0.0).is_none());
        assert!(session.is_eligible());
    }

    #[test]
    fn gesture_beyond_question_options_is_ignored() {
        let mut session = session();
        session.select_answer(1, InputMethod::Manual, 0.0);
        session.next_question();
        session.select_answer(1, InputMethod::Manual, 0.0);
        session.next_question();
        assert_eq!(session.current_question().options.len(), 2);

        let updates = hold(&mut session, 4, 0, 2000, 100);
        assert!(updates.iter().all(|u| u.answered.is_none()));
        assert!(session.is_eligible());
    }

    #[test]
    fn navigation_resets_hold() {
        let mut session = session();
        session.select_answer(1, InputMethod::Manual, 0.0);
        assert!(session.next_question());
        hold(&mut session, 2, 0, 1500, 100);
        assert_eq!(session.tracked_option(), Some(2));

        assert!(session.previous_question());
        assert_eq!(session.tracked_option(), None);
        assert!(!session.previous_question());
    }

    #[test]
    fn next_question_stops_at_last() {
        let mut session = session();
        assert!(session.next_question());
        assert!(session.next_question());
        assert!(!session.next_question());
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn results_require_every_answer() {
        let mut session = session();
        session.select_answer(1, InputMethod::Manual, 0.0);
        let err = session.show_results(5000.0).unwrap_err();
        assert!(err.to_string().contains("2 question(s)"));

        session.next_question();
        session.select_answer(0, InputMethod::Manual, 0.0);
        session.next_question();
        session.select_answer(1, InputMethod::Manual, 0.0);

        session.show_results(61_500.0).unwrap();
        assert!(session.showing_results);
        assert!(!session.is_eligible());
        assert_eq!(session.time_spent_secs(120_000.0), 61);

        let score = session.score();
        assert_eq!(score.correct, 2);
        assert_eq!(score.total, 3);
        assert_eq!(score.percentage, 67);
    }

    #[test]
    fn results_freeze_navigation() {
        let mut session = session();
        for index in 0..3 {
            let answer = session.current_question().correct_answer;
            session.select_answer(answer, InputMethod::Manual, 0.0);
            if index < 2 {
                session.next_question();
            }
        }
        session.show_results(1000.0).unwrap();
        assert!(!session.previous_question());
        assert!(!session.next_question());
    }

    #[test]
    fn reset_gestures_cancels_hold() {
        let mut session = session();
        hold(&mut session, 1, 0, 1000, 100);
        session.reset_gestures();
        assert_eq!(session.tracked_option(), None);
        assert_eq!(session.peek_progress(1100.0), 0.0);
    }

    #[test]
    fn clock_only_moves_forward() {
        let mut session = session();
        session.advance_clock(500.0);
        session.advance_clock(200.0);
        session.advance_clock(f64::NAN);
        assert_eq!(session.latest_ms(), 500.0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut session = session();
        session.handle_finger_count(2, 0.0);
        let snapshot = session.snapshot(3500.0);
        assert_eq!(snapshot.question_count, 3);
        assert_eq!(snapshot.tracked_option, Some(2));
        assert!(snapshot.eligible);
        assert_eq!(snapshot.time_spent_secs, 3);
    }
}
