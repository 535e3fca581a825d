pub mod config;
pub mod engine;
pub mod state;

pub use config::SelectionConfig;
pub use engine::{SelectionEngine, SelectionOutput};
pub use state::{CooldownState, RawObservation, TrackingState};
