use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_method, to_i64, to_usize},
    models::AnswerRecord,
    Database,
};

fn row_to_answer(row: &Row) -> Result<AnswerRecord> {
    let question_index: i64 = row.get("question_index")?;
    let option_index: i64 = row.get("option_index")?;
    let method: String = row.get("method")?;
    let answered_at: String = row.get("answered_at")?;

    Ok(AnswerRecord {
        id: Some(row.get("id")?),
        attempt_id: row.get("attempt_id")?,
        question_index: to_usize(question_index, "question_index")?,
        option_index: to_usize(option_index, "option_index")?,
        correct: row.get("correct")?,
        method: parse_method(&method)?,
        answered_at: parse_datetime(&answered_at, "answered_at")?,
    })
}

impl Database {
    /// Returns the new row id. A second answer for the same question of the
    /// same attempt is rejected by the unique constraint.
    pub async fn insert_answer(&self, answer: &AnswerRecord) -> Result<i64> {
        let record = answer.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO answers (attempt_id, question_index, option_index, correct, method, answered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.attempt_id,
                    to_i64(record.question_index as u64)?,
                    to_i64(record.option_index as u64)?,
                    record.correct,
                    record.method.as_str(),
                    record.answered_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Ordered by question.
    pub async fn get_answers_for_attempt(&self, attempt_id: &str) -> Result<Vec<AnswerRecord>> {
        let attempt_id = attempt_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, attempt_id, question_index, option_index, correct, method, answered_at
                 FROM answers
                 WHERE attempt_id = ?1
                 ORDER BY question_index ASC",
            )?;

            let mut rows = stmt.query(params![attempt_id])?;
            let mut answers = Vec::new();
            while let Some(row) = rows.next()? {
                answers.push(row_to_answer(row)?);
            }

            Ok(answers)
        })
        .await
    }
}
