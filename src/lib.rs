mod db;
mod frames;
mod host;
mod quiz;
mod selection;
mod settings;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use db::Database;
use quiz::{EventEmitter, QuizController, QuizEvent};
use settings::SettingsStore;

pub use quiz::{Quiz, QuizQuestion, QuizReport};
pub use selection::{RawObservation, SelectionConfig, SelectionEngine, SelectionOutput};

pub struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: Arc<SettingsStore>,
    pub(crate) quiz: QuizController,
}

impl AppState {
    /// Opens the database and settings under `data_dir`. The receiver yields
    /// every event of every attempt started through this state.
    pub fn open(data_dir: &Path) -> Result<(Self, mpsc::UnboundedReceiver<QuizEvent>)> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let db = Database::new(data_dir.join("gesture-quiz.sqlite3"))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let (events, events_rx) = EventEmitter::channel();
        let quiz = QuizController::new(db.clone(), settings.clone(), events);

        Ok((Self { db, settings, quiz }, events_rx))
    }
}

#[derive(Debug, Parser)]
#[command(name = "gesture-quiz")]
#[command(about = "Answer quizzes by holding up fingers")]
struct Cli {
    /// Where the database and settings live.
    #[arg(long, default_value = ".gesture-quiz")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an attempt from a trace file, or from stdin when no trace is given.
    Play(PlayArgs),
    /// List past attempts.
    History(HistoryArgs),
    /// Show one attempt with its answers.
    Show { attempt_id: String },
    Settings(SettingsArgs),
}

#[derive(Debug, Args)]
struct PlayArgs {
    #[arg(long)]
    quiz: PathBuf,
    #[arg(long)]
    trace: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long, default_value_t = 20)]
    limit: usize,
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set(SettingsSetArgs),
}

#[derive(Debug, Args)]
struct SettingsSetArgs {
    #[arg(long)]
    max_options: Option<u32>,
    #[arg(long)]
    dwell_ms: Option<u64>,
    #[arg(long)]
    cooldown_ms: Option<u64>,
    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,
    #[arg(long)]
    target_fps: Option<u32>,
    #[arg(long, value_parser = ["on", "off"])]
    sound: Option<String>,
    #[arg(long)]
    sound_cooldown_ms: Option<u64>,
}

/// Info by default; `RUST_LOG` directives are applied on top.
fn logger_builder(rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(filters) = rust_log {
        builder.parse_filters(filters);
    }
    builder
}

pub fn run() {
    logger_builder(std::env::var("RUST_LOG").ok().as_deref()).init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(execute(cli)) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let (state, events) = AppState::open(&cli.data_dir)?;

    // Finalize attempts that were running when the host last crashed.
    let recovered = state.db.recover_interrupted_attempts().await?;
    if recovered > 0 {
        log::warn!("Recovered {recovered} interrupted attempt(s)");
    }

    match cli.command {
        Commands::Play(args) => {
            host::play(&state, events, &args.quiz, args.trace.as_deref()).await
        }
        Commands::History(args) => {
            let attempts = quiz::commands::list_attempts(&state, args.limit, args.offset)
                .await
                .map_err(anyhow::Error::msg)?;
            host::print_json(&attempts)
        }
        Commands::Show { attempt_id } => {
            let detail = quiz::commands::get_attempt_detail(&state, &attempt_id)
                .await
                .map_err(anyhow::Error::msg)?;
            host::print_json(&detail)
        }
        Commands::Settings(SettingsArgs { action }) => match action {
            SettingsAction::Show => {
                host::print_json(&quiz::commands::get_settings(&state).map_err(anyhow::Error::msg)?)
            }
            SettingsAction::Set(args) => {
                apply_settings(&state, args)?;
                host::print_json(&quiz::commands::get_settings(&state).map_err(anyhow::Error::msg)?)
            }
        },
    }
}

fn apply_settings(state: &AppState, args: SettingsSetArgs) -> Result<()> {
    let current = state.settings.snapshot();

    let mut gesture = current.gesture.clone();
    if let Some(value) = args.max_options {
        gesture.max_options = value;
    }
    if let Some(value) = args.dwell_ms {
        gesture.dwell_ms = value;
    }
    if let Some(value) = args.cooldown_ms {
        gesture.cooldown_ms = value;
    }
    if let Some(value) = args.poll_ms {
        gesture.progress_poll_interval_ms = value;
    }
    if let Some(value) = args.target_fps {
        gesture.target_fps = value;
    }
    if gesture != current.gesture {
        quiz::commands::update_gesture_settings(state, gesture).map_err(anyhow::Error::msg)?;
    }

    let mut feedback = current.feedback.clone();
    if let Some(sound) = args.sound.as_deref() {
        feedback.sound_enabled = sound == "on";
    }
    if let Some(value) = args.sound_cooldown_ms {
        feedback.sound_cooldown_ms = value;
    }
    if feedback != current.feedback {
        quiz::commands::update_feedback_settings(state, feedback).map_err(anyhow::Error::msg)?;
    }

    Ok(())
}
