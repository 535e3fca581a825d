//! Line-oriented input format shared by recorded traces and live stdin.
//!
//! A trace line is `<t_ms> <entry>`; a live line is just `<entry>` and is
//! stamped on arrival. An entry is a finger count (`0`, `3`, `-1`, …) or one
//! of `next`, `prev`, `finish`, `refresh`, `click <option>`, where `<option>`
//! is 1-based like a finger count. `#` starts a comment.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};

use crate::selection::RawObservation;

use super::SessionInput;

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn parse_entry<'a>(mut words: impl Iterator<Item = &'a str>, at_ms: f64) -> Result<SessionInput> {
    let head = words.next().ok_or_else(|| anyhow!("missing entry"))?;

    let input = match head.to_ascii_lowercase().as_str() {
        "next" => SessionInput::Next { at_ms },
        "prev" | "previous" => SessionInput::Previous { at_ms },
        "finish" | "results" => SessionInput::Finish { at_ms },
        "refresh" => SessionInput::RefreshDetection { at_ms },
        "click" => {
            let raw = words
                .next()
                .ok_or_else(|| anyhow!("click needs an option number"))?;
            let option: usize = raw
                .parse()
                .with_context(|| format!("invalid click option '{raw}'"))?;
            if option == 0 {
                bail!("click options start at 1");
            }
            SessionInput::Click {
                option_index: option - 1,
                at_ms,
            }
        }
        other => {
            let count: i64 = other
                .parse()
                .with_context(|| format!("unknown entry '{other}'"))?;
            SessionInput::Frame(RawObservation::new(count, at_ms))
        }
    };

    if let Some(extra) = words.next() {
        bail!("unexpected trailing '{extra}'");
    }
    Ok(input)
}

pub fn parse_trace(contents: &str) -> Result<Vec<SessionInput>> {
    let mut inputs = Vec::new();
    let mut last_ms = f64::NEG_INFINITY;

    for (number, raw_line) in contents.lines().enumerate() {
        let line = strip_comment(raw_line);
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let stamp = words.next().unwrap_or_default();
        let at_ms: f64 = stamp
            .parse()
            .with_context(|| format!("line {}: invalid timestamp '{stamp}'", number + 1))?;
        if !at_ms.is_finite() || at_ms < 0.0 {
            bail!("line {}: timestamp must be a non-negative number", number + 1);
        }
        if at_ms < last_ms {
            bail!(
                "line {}: timestamp {at_ms} goes backwards (previous {last_ms})",
                number + 1
            );
        }
        last_ms = at_ms;

        let input =
            parse_entry(words, at_ms).with_context(|| format!("line {}", number + 1))?;
        inputs.push(input);
    }

    Ok(inputs)
}

pub fn load_trace(path: &Path) -> Result<Vec<SessionInput>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&contents).with_context(|| format!("invalid trace {}", path.display()))
}

/// `Ok(None)` for blank or comment-only lines.
pub fn parse_live_line(line: &str, at_ms: f64) -> Result<Option<SessionInput>> {
    let line = strip_comment(line);
    if line.is_empty() {
        return Ok(None);
    }
    parse_entry(line.split_whitespace(), at_ms).map(Some)
}
