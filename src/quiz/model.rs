use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read quiz from {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid quiz in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let quiz: Quiz = serde_json::from_str(contents).context("failed to parse quiz JSON")?;
        quiz.validate()?;
        Ok(quiz)
    }

    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            bail!("quiz '{}' has no questions", self.title);
        }

        for (index, question) in self.questions.iter().enumerate() {
            if question.options.is_empty() {
                bail!("question {} has no options", index + 1);
            }
            if question.correct_answer >= question.options.len() {
                bail!(
                    "question {} marks option {} correct but only has {} options",
                    index + 1,
                    question.correct_answer,
                    question.options.len()
                );
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// `0 -> "A"`, `1 -> "B"`, …; past `Z` falls back to the 1-based number.
pub fn option_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(offset) if offset < 26 => char::from(b'A' + offset).to_string(),
        _ => (index + 1).to_string(),
    }
}

#[cfg(test)]
pub(crate) fn sample_quiz() -> Quiz {
    Quiz::from_json(
        r#"{
            "title": "Rust basics",
            "description": "Ownership and borrowing",
            "questions": [
                {
                    "question": "Which keyword makes a binding mutable?",
                    "options": ["let", "mut", "ref", "move"],
                    "correctAnswer": 1,
                    "explanation": "`mut` opts a binding into mutation."
                },
                {
                    "question": "How many mutable borrows may coexist?",
                    "options": ["Zero", "One", "Two", "Unlimited"],
                    "correctAnswer": 1,
                    "explanation": "Exactly one mutable borrow at a time."
                },
                {
                    "question": "Is `String` Copy?",
                    "options": ["Yes", "No"],
                    "correctAnswer": 1,
                    "explanation": "`String` owns a heap buffer."
                }
            ]
        }"#,
    )
    .unwrap()
}
