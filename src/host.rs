//! Terminal front end for `play`: feeds inputs from a trace or stdin and
//! prints events as JSON lines. On stdin, `status` prints the current
//! attempt snapshot instead of feeding the session.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    frames::{load_trace, parse_live_line, SessionInput},
    quiz::{
        commands::{cancel_attempt, finish_attempt, get_attempt_snapshot, start_attempt},
        controller::{AttemptHandle, AttemptMode},
        QuizEvent,
    },
    AppState,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

enum InputOutcome {
    Finished,
    Interrupted,
}

pub async fn play(
    state: &AppState,
    mut events: mpsc::UnboundedReceiver<QuizEvent>,
    quiz_path: &Path,
    trace_path: Option<&Path>,
) -> Result<()> {
    let trace = trace_path.map(load_trace).transpose()?;
    let mode = if trace.is_some() {
        AttemptMode::Replay
    } else {
        AttemptMode::Live
    };

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("failed to serialize event: {err}"),
            }
            if matches!(event, QuizEvent::AttemptFinished { .. }) {
                break;
            }
        }
    });

    let handle = match start_attempt(state, quiz_path, mode).await {
        Ok(handle) => handle,
        Err(err) => {
            printer.abort();
            return Err(anyhow!(err));
        }
    };

    let outcome = match trace {
        Some(inputs) => {
            log_info!("replaying {} trace entries", inputs.len());
            replay(&handle, inputs).await?;
            InputOutcome::Finished
        }
        None => read_stdin(state, &handle).await?,
    };

    let summary = match outcome {
        InputOutcome::Finished => finish_attempt(state).await,
        InputOutcome::Interrupted => cancel_attempt(state).await,
    };
    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            printer.abort();
            return Err(anyhow!(err));
        }
    };

    printer.await.context("event printer failed")?;
    println!();
    print!("{}", summary.report.render_text());
    Ok(())
}

async fn replay(handle: &AttemptHandle, inputs: Vec<SessionInput>) -> Result<()> {
    for input in inputs {
        handle
            .inputs
            .send(input)
            .await
            .map_err(|_| anyhow!("session loop stopped before the trace ended"))?;
    }
    Ok(())
}

/// One JSON line describing the running attempt, `null` when none is active.
async fn status_line(state: &AppState) -> Result<String> {
    let snapshot = get_attempt_snapshot(state).await.map_err(|e| anyhow!(e))?;
    serde_json::to_string(&snapshot).context("failed to serialize snapshot")
}

/// Reads live entries until `finish`, end of input, or Ctrl-C.
async fn read_stdin(state: &AppState, handle: &AttemptHandle) -> Result<InputOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                log_warn!("interrupted; abandoning attempt {}", handle.attempt_id);
                return Ok(InputOutcome::Interrupted);
            }
        };

        let Some(line) = line else {
            return Ok(InputOutcome::Finished);
        };

        if line.trim().eq_ignore_ascii_case("status") {
            println!("{}", status_line(state).await?);
            continue;
        }

        let input = match parse_live_line(&line, handle.clock.now_ms()) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(err) => {
                log_warn!("ignoring input '{}': {err:#}", line.trim());
                continue;
            }
        };

        let finishing = matches!(input, SessionInput::Finish { .. });
        handle
            .inputs
            .send(input)
            .await
            .map_err(|_| anyhow!("session loop stopped"))?;
        if finishing {
            return Ok(InputOutcome::Finished);
        }
    }
}
