use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64, to_usize},
    models::{Attempt, AttemptStatus},
    Database,
};

const ATTEMPT_COLUMNS: &str = "id, quiz_title, question_count, started_at, finished_at, status, correct_count, time_spent_secs, created_at, updated_at";

fn row_to_attempt(row: &Row) -> Result<Attempt> {
    let question_count: i64 = row.get("question_count")?;
    let started_at: String = row.get("started_at")?;
    let finished_at: Option<String> = row.get("finished_at")?;
    let status: String = row.get("status")?;
    let correct_count: i64 = row.get("correct_count")?;
    let time_spent_secs: i64 = row.get("time_spent_secs")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Attempt {
        id: row.get("id")?,
        quiz_title: row.get("quiz_title")?,
        question_count: to_usize(question_count, "question_count")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        finished_at: parse_optional_datetime(finished_at, "finished_at")?,
        status: parse_status(&status)?,
        correct_count: to_usize(correct_count, "correct_count")?,
        time_spent_secs: to_u64(time_spent_secs, "time_spent_secs")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        let record = attempt.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attempts (id, quiz_title, question_count, started_at, finished_at, status, correct_count, time_spent_secs, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.quiz_title,
                    to_i64(record.question_count as u64)?,
                    record.started_at.to_rfc3339(),
                    record.finished_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.correct_count as u64)?,
                    to_i64(record.time_spent_secs)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_attempt_status(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        correct_count: usize,
        time_spent_secs: u64,
        finished_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let attempt_id = attempt_id.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE attempts
                 SET status = ?1,
                     correct_count = ?2,
                     time_spent_secs = ?3,
                     finished_at = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    status.as_str(),
                    to_i64(correct_count as u64)?,
                    to_i64(time_spent_secs)?,
                    finished_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    attempt_id,
                ],
            )?;
            if changed == 0 {
                return Err(anyhow!("attempt {attempt_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let attempt_id = attempt_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1"
            ))?;

            let attempt = stmt
                .query_row(params![attempt_id], |row| Ok(row_to_attempt(row)))
                .optional()?
                .transpose()?;
            Ok(attempt)
        })
        .await
    }

    /// Newest first.
    pub async fn list_attempts(&self, limit: usize, offset: usize) -> Result<Vec<Attempt>> {
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 ORDER BY started_at DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let mut rows = stmt.query(params![limit, offset])?;
            let mut attempts = Vec::new();
            while let Some(row) = rows.next()? {
                attempts.push(row_to_attempt(row)?);
            }

            Ok(attempts)
        })
        .await
    }

    pub async fn get_incomplete_attempt(&self) -> Result<Option<Attempt>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE status = 'Running'
                 ORDER BY started_at DESC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            let attempt = match rows.next()? {
                Some(row) => Some(row_to_attempt(row)?),
                None => None,
            };
            Ok(attempt)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::test_database;

    #[tokio::test]
    async fn inserts_and_reads_back_attempt() {
        let (_dir, db) = test_database();
        let now = Utc::now();
        let attempt = Attempt::start("a-1".into(), "Rust basics".into(), 3, now);

        db.insert_attempt(&attempt).await.unwrap();
        let stored = db.get_attempt("a-1").await.unwrap().unwrap();

        assert_eq!(stored.quiz_title, "Rust basics");
        assert_eq!(stored.question_count, 3);
        assert_eq!(stored.status, AttemptStatus::Running);
        assert_eq!(stored.finished_at, None);
        assert!(db.get_attempt("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_update_records_score() {
        let (_dir, db) = test_database();
        let now = Utc::now();
        db.insert_attempt(&Attempt::start("a-1".into(), "Quiz".into(), 4, now))
            .await
            .unwrap();

        let finished = now + Duration::seconds(90);
        db.mark_attempt_status("a-1", AttemptStatus::Completed, 3, 90, Some(finished), finished)
            .await
            .unwrap();

        let stored = db.get_attempt("a-1").await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Completed);
        assert_eq!(stored.correct_count, 3);
        assert_eq!(stored.time_spent_secs, 90);
        assert!(stored.finished_at.is_some());

        let missing = db
            .mark_attempt_status("nope", AttemptStatus::Abandoned, 0, 0, None, finished)
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn incomplete_attempt_is_latest_running() {
        let (_dir, db) = test_database();
        let now = Utc::now();
        let older = Attempt::start("old".into(), "Quiz".into(), 2, now - Duration::minutes(5));
        let newer = Attempt::start("new".into(), "Quiz".into(), 2, now);
        db.insert_attempt(&older).await.unwrap();
        db.insert_attempt(&newer).await.unwrap();

        let found = db.get_incomplete_attempt().await.unwrap().unwrap();
        assert_eq!(found.id, "new");

        for id in ["old", "new"] {
            db.mark_attempt_status(id, AttemptStatus::Interrupted, 0, 0, Some(now), now)
                .await
                .unwrap();
        }
        assert!(db.get_incomplete_attempt().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_newest_first_with_paging() {
        let (_dir, db) = test_database();
        let now = Utc::now();
        for minutes in 0..3 {
            let attempt = Attempt::start(
                format!("a-{minutes}"),
                "Quiz".into(),
                1,
                now + Duration::minutes(minutes),
            );
            db.insert_attempt(&attempt).await.unwrap();
        }

        let page: Vec<_> = db
            .list_attempts(2, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(page, vec!["a-2", "a-1"]);

        let rest = db.list_attempts(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "a-0");
    }
}
