use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::{db::models::AttemptStatus, quiz::InputMethod};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn to_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{field} contains invalid index {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<AttemptStatus> {
    match value {
        "Running" => Ok(AttemptStatus::Running),
        "Completed" => Ok(AttemptStatus::Completed),
        "Abandoned" => Ok(AttemptStatus::Abandoned),
        "Interrupted" => Ok(AttemptStatus::Interrupted),
        other => Err(anyhow!("unknown attempt status {other}")),
    }
}

pub fn parse_method(value: &str) -> Result<InputMethod> {
    match value {
        "Gesture" => Ok(InputMethod::Gesture),
        "Manual" => Ok(InputMethod::Manual),
        other => Err(anyhow!("unknown input method {other}")),
    }
}
