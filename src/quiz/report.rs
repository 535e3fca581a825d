use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::{
    model::{option_label, Quiz},
    score::{avg_time_per_question_secs, format_time, Grade, QuizScore},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Skipped,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Correct => "Correct",
            AnswerStatus::Incorrect => "Incorrect",
            AnswerStatus::Skipped => "Skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReport {
    pub number: usize,
    pub question: String,
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub status: AnswerStatus,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub title: String,
    pub score: QuizScore,
    pub grade: Grade,
    pub time_spent_secs: u64,
    pub avg_time_per_question_secs: u64,
    pub questions: Vec<QuestionReport>,
}

fn describe_option(quiz: &Quiz, question_index: usize, option_index: usize) -> String {
    let text = quiz.questions[question_index]
        .options
        .get(option_index)
        .map(String::as_str)
        .unwrap_or("?");
    format!("{}. {}", option_label(option_index), text)
}

impl QuizReport {
    pub fn build(quiz: &Quiz, selected: &[Option<usize>], time_spent_secs: u64) -> Self {
        let score = QuizScore::from_answers(quiz, selected);

        let questions = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = selected.get(index).copied().flatten();
                let status = match answer {
                    None => AnswerStatus::Skipped,
                    Some(choice) if choice == question.correct_answer => AnswerStatus::Correct,
                    Some(_) => AnswerStatus::Incorrect,
                };

                QuestionReport {
                    number: index + 1,
                    question: question.question.clone(),
                    your_answer: answer.map(|choice| describe_option(quiz, index, choice)),
                    correct_answer: describe_option(quiz, index, question.correct_answer),
                    status,
                    explanation: question.explanation.clone(),
                }
            })
            .collect();

        Self {
            title: quiz.title.clone(),
            grade: score.grade(),
            score,
            time_spent_secs,
            avg_time_per_question_secs: avg_time_per_question_secs(time_spent_secs, quiz.len()),
            questions,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Quiz: {}", self.title);
        let _ = writeln!(out, "Time Taken: {}", format_time(self.time_spent_secs));
        let _ = writeln!(
            out,
            "Overall Score: {}% (grade {})",
            self.score.percentage,
            self.grade.as_str()
        );
        let _ = writeln!(
            out,
            "Correct Answers: {} out of {}",
            self.score.correct, self.score.total
        );
        let _ = writeln!(out, "Incorrect Answers: {}", self.score.incorrect());
        let _ = writeln!(
            out,
            "Average Response Time: {}",
            format_time(self.avg_time_per_question_secs)
        );

        for entry in &self.questions {
            let _ = writeln!(out);
            let _ = writeln!(out, "Q{}: {}", entry.number, entry.question);
            let _ = writeln!(
                out,
                "Your Answer: {}",
                entry.your_answer.as_deref().unwrap_or("Not answered")
            );
            let _ = writeln!(out, "Status: {}", entry.status.as_str());
            let _ = writeln!(out, "Correct Answer: {}", entry.correct_answer);
            if !entry.explanation.is_empty() {
                let _ = writeln!(out, "Explanation: {}", entry.explanation);
            }
        }

        out
    }
}
