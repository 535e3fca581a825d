use std::path::Path;

use serde::Serialize;

use crate::{
    db::{AnswerRecord, Attempt},
    settings::{FeedbackSettings, GestureSettings, UserSettings},
    AppState,
};

use super::{
    controller::{AttemptHandle, AttemptMode, AttemptSummary},
    Quiz, SessionSnapshot,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDetail {
    pub attempt: Attempt,
    pub answers: Vec<AnswerRecord>,
}

pub async fn start_attempt(
    state: &AppState,
    quiz_path: &Path,
    mode: AttemptMode,
) -> Result<AttemptHandle, String> {
    let quiz = Quiz::load(quiz_path).map_err(|e| format!("{e:#}"))?;
    state
        .quiz
        .start_attempt(quiz, mode)
        .await
        .map_err(|e| e.to_string())
}

pub async fn finish_attempt(state: &AppState) -> Result<AttemptSummary, String> {
    state.quiz.finish().await.map_err(|e| e.to_string())
}

pub async fn cancel_attempt(state: &AppState) -> Result<AttemptSummary, String> {
    state.quiz.cancel().await.map_err(|e| e.to_string())
}

pub async fn get_attempt_snapshot(state: &AppState) -> Result<Option<SessionSnapshot>, String> {
    Ok(state.quiz.snapshot().await)
}

pub async fn list_attempts(
    state: &AppState,
    limit: usize,
    offset: usize,
) -> Result<Vec<Attempt>, String> {
    state
        .db
        .list_attempts(limit, offset)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_attempt_detail(
    state: &AppState,
    attempt_id: &str,
) -> Result<AttemptDetail, String> {
    let attempt = state
        .db
        .get_attempt(attempt_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("attempt {attempt_id} not found"))?;
    let answers = state
        .db
        .get_answers_for_attempt(attempt_id)
        .await
        .map_err(|e| e.to_string())?;

    Ok(AttemptDetail { attempt, answers })
}

pub fn get_settings(state: &AppState) -> Result<UserSettings, String> {
    Ok(state.settings.snapshot())
}

pub fn update_gesture_settings(state: &AppState, settings: GestureSettings) -> Result<(), String> {
    state
        .settings
        .update_gesture(settings)
        .map_err(|e| format!("{e:#}"))
}

pub fn update_feedback_settings(
    state: &AppState,
    settings: FeedbackSettings,
) -> Result<(), String> {
    state
        .settings
        .update_feedback(settings)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::model::sample_quiz;

    fn write_quiz(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("quiz.json");
        std::fs::write(&path, serde_json::to_string(&sample_quiz()).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn detail_includes_answers() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _events) = AppState::open(dir.path()).unwrap();
        let quiz_path = write_quiz(dir.path());

        let handle = start_attempt(&state, &quiz_path, AttemptMode::Replay)
            .await
            .unwrap();
        handle
            .inputs
            .send(crate::frames::SessionInput::Click {
                option_index: 1,
                at_ms: 500.0,
            })
            .await
            .unwrap();
        finish_attempt(&state).await.unwrap();

        let detail = get_attempt_detail(&state, &handle.attempt_id).await.unwrap();
        assert_eq!(detail.attempt.correct_count, 1);
        assert_eq!(detail.answers.len(), 1);

        let listed = list_attempts(&state, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);

        let err = get_attempt_detail(&state, "missing").await.unwrap_err();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn missing_quiz_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _events) = AppState::open(dir.path()).unwrap();
        let err = start_attempt(&state, &dir.path().join("nope.json"), AttemptMode::Replay)
            .await
            .unwrap_err();
        assert!(err.contains("nope.json"));
    }

    #[test]
    fn invalid_gesture_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _events) = AppState::open(dir.path()).unwrap();
        let settings = GestureSettings {
            dwell_ms: 0,
            ..GestureSettings::default()
        };
        assert!(update_gesture_settings(&state, settings).is_err());
        assert_eq!(get_settings(&state).unwrap(), UserSettings::default());
    }
}
