use serde::{Deserialize, Serialize};

use super::model::Quiz;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    /// Rounded half-up; zero for an empty quiz.
    pub percentage: u32,
}

impl QuizScore {
    pub fn from_answers(quiz: &Quiz, selected: &[Option<usize>]) -> Self {
        let correct = quiz
            .questions
            .iter()
            .zip(selected)
            .filter(|(question, answer)| **answer == Some(question.correct_answer))
            .count();
        Self::new(correct, quiz.len())
    }

    pub fn new(correct: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (correct as f64 / total as f64 * 100.0).round() as u32
        } else {
            0
        };
        Self {
            correct,
            total,
            percentage,
        }
    }

    pub fn incorrect(&self) -> usize {
        self.total.saturating_sub(self.correct)
    }

    pub fn grade(&self) -> Grade {
        match self.percentage {
            p if p >= 90 => Grade::A,
            p if p >= 80 => Grade::B,
            p if p >= 70 => Grade::C,
            _ => Grade::D,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

pub fn avg_time_per_question_secs(time_spent_secs: u64, question_count: usize) -> u64 {
    if question_count == 0 {
        return 0;
    }
    time_spent_secs / question_count as u64
}

/// `m:ss`, minutes unbounded.
pub fn format_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
